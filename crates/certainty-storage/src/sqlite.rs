use certainty_common::types::{CertificateMonitor, CreateMonitorRequest, MonitorState};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StorageError};
use crate::{CheckUpdate, MonitorStore};

const MONITORS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS certificate_monitors (
    id TEXT PRIMARY KEY,
    domain TEXT NOT NULL CHECK (length(trim(domain)) > 0),
    email TEXT NOT NULL,
    warning_days INTEGER NOT NULL DEFAULT 7 CHECK (warning_days BETWEEN 1 AND 365),
    enabled INTEGER NOT NULL DEFAULT 1,
    state TEXT NOT NULL DEFAULT 'UNKNOWN',
    serial TEXT,
    not_before INTEGER,
    not_after INTEGER,
    checked_at INTEGER,
    created_at INTEGER NOT NULL,
    CHECK (
        (serial IS NULL AND not_before IS NULL AND not_after IS NULL)
        OR (serial IS NOT NULL AND not_before IS NOT NULL AND not_after IS NOT NULL)
    )
);
CREATE INDEX IF NOT EXISTS idx_monitors_email ON certificate_monitors(email);
CREATE INDEX IF NOT EXISTS idx_monitors_due ON certificate_monitors(enabled, checked_at);
";

const SELECT_COLUMNS: &str = "id, domain, email, warning_days, enabled, state, serial, \
     not_before, not_after, checked_at, created_at";

const ENTITY: &str = "monitor";

/// SQLite-backed [`MonitorStore`].
///
/// Every call holds the connection lock for exactly one statement, so a
/// refresh's read and its write are separate and last-write-wins per record.
pub struct SqliteMonitorStore {
    conn: Mutex<Connection>,
}

impl SqliteMonitorStore {
    /// Opens (or creates) `<data_dir>/certainty.db`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::Other(format!(
                "failed to create data dir {}: {e}",
                data_dir.display()
            ))
        })?;
        let db_path = data_dir.join("certainty.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(MONITORS_SCHEMA)?;
        tracing::info!(path = %db_path.display(), "Initialized monitor store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(id: &str) -> StorageError {
        StorageError::NotFound {
            entity: ENTITY,
            id: id.to_string(),
        }
    }
}

/// Column values as SQLite hands them back, before timestamp conversion.
struct MonitorRow {
    id: String,
    domain: String,
    email: String,
    warning_days: u32,
    enabled: bool,
    state: String,
    serial: Option<String>,
    not_before: Option<i64>,
    not_after: Option<i64>,
    checked_at: Option<i64>,
    created_at: i64,
}

impl MonitorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            domain: row.get(1)?,
            email: row.get(2)?,
            warning_days: row.get(3)?,
            enabled: row.get(4)?,
            state: row.get(5)?,
            serial: row.get(6)?,
            not_before: row.get(7)?,
            not_after: row.get(8)?,
            checked_at: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_monitor(self) -> Result<CertificateMonitor> {
        let state = self
            .state
            .parse::<MonitorState>()
            .map_err(|_| StorageError::InvalidState(self.state.clone()))?;
        Ok(CertificateMonitor {
            id: self.id,
            domain: self.domain,
            email: self.email,
            warning_days: self.warning_days,
            enabled: self.enabled,
            state,
            serial: self.serial,
            not_before: opt_timestamp("not_before", self.not_before)?,
            not_after: opt_timestamp("not_after", self.not_after)?,
            checked_at: opt_timestamp("checked_at", self.checked_at)?,
            created_at: timestamp("created_at", self.created_at)?,
        })
    }
}

fn timestamp(column: &'static str, value: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(value, 0).ok_or(StorageError::InvalidTimestamp { column, value })
}

fn opt_timestamp(column: &'static str, value: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| timestamp(column, v)).transpose()
}

fn collect_monitors(rows: Vec<MonitorRow>) -> Result<Vec<CertificateMonitor>> {
    rows.into_iter().map(MonitorRow::into_monitor).collect()
}

impl MonitorStore for SqliteMonitorStore {
    fn create(&self, req: &CreateMonitorRequest) -> Result<CertificateMonitor> {
        let id = certainty_common::id::next_id();
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO certificate_monitors (id, domain, email, warning_days, enabled, state, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
            params![
                id,
                req.domain,
                req.email,
                req.warning_days,
                MonitorState::Unknown.as_str(),
                now.timestamp()
            ],
        )?;
        tracing::debug!(monitor_id = %id, domain = %req.domain, "Monitor created");
        self.get(&id)
    }

    fn get(&self, id: &str) -> Result<CertificateMonitor> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM certificate_monitors WHERE id = ?1"),
                params![id],
                MonitorRow::from_row,
            )
            .optional()?;
        row.ok_or_else(|| Self::not_found(id))?.into_monitor()
    }

    fn list_due(&self, checked_before: DateTime<Utc>) -> Result<Vec<CertificateMonitor>> {
        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM certificate_monitors
                 WHERE enabled = 1 AND (checked_at IS NULL OR checked_at < ?1)
                 ORDER BY checked_at IS NOT NULL, checked_at ASC"
            ))?;
            let mapped = stmt.query_map(params![checked_before.timestamp()], MonitorRow::from_row)?;
            let rows = mapped.collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        collect_monitors(rows)
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<CertificateMonitor>> {
        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM certificate_monitors
                 WHERE email = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let mapped = stmt.query_map(params![email], MonitorRow::from_row)?;
            let rows = mapped.collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        collect_monitors(rows)
    }

    fn save_check(&self, id: &str, update: &CheckUpdate) -> Result<()> {
        let checked_at = update.checked_at.timestamp();
        let changed = self.conn().execute(
            "UPDATE certificate_monitors
             SET serial = ?2,
                 not_before = ?3,
                 not_after = ?4,
                 checked_at = CASE
                     WHEN checked_at IS NULL OR checked_at < ?5 THEN ?5
                     ELSE checked_at
                 END,
                 state = ?6
             WHERE id = ?1",
            params![
                id,
                update.serial,
                update.not_before.map(|t| t.timestamp()),
                update.not_after.map(|t| t.timestamp()),
                checked_at,
                update.state.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE certificate_monitors SET enabled = ?2 WHERE id = ?1",
            params![id, enabled],
        )?;
        if changed == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM certificate_monitors WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
