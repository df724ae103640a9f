#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use certainty_common::types::{NotificationKind, NotificationRequest};
use certainty_notify::error::NotifyError;
use certainty_notify::NotificationQueue;
use certainty_server::app;
use certainty_server::config::ServerConfig;
use certainty_server::monitor::engine::RefreshEngine;
use certainty_server::monitor::inspector::{CertificateFacts, CertificateInspector};
use certainty_server::monitor::scheduler::SweepScheduler;
use certainty_server::monitor::service::MonitorService;
use certainty_server::state::AppState;
use certainty_storage::{MonitorStore, SqliteMonitorStore};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Inspector returning whatever each domain was scripted with. Unscripted
/// domains behave like unreachable hosts.
#[derive(Default)]
pub struct ScriptedInspector {
    facts: Mutex<HashMap<String, CertificateFacts>>,
    hooks: Mutex<HashMap<String, Hook>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedInspector {
    pub fn set(&self, domain: &str, facts: CertificateFacts) {
        self.facts.lock().unwrap().insert(domain.to_string(), facts);
    }

    pub fn fail(&self, domain: &str) {
        self.facts.lock().unwrap().remove(domain);
    }

    /// Runs `hook` while `domain` is being inspected.
    pub fn on_inspect(&self, domain: &str, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .insert(domain.to_string(), Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateInspector for ScriptedInspector {
    async fn inspect(&self, domain: &str) -> Option<CertificateFacts> {
        self.calls.lock().unwrap().push(domain.to_string());
        let hook = self.hooks.lock().unwrap().get(domain).cloned();
        if let Some(hook) = hook {
            hook();
        }
        tokio::task::yield_now().await;
        self.facts.lock().unwrap().get(domain).cloned()
    }
}

/// Queue that keeps every request it is handed.
#[derive(Default)]
pub struct RecordingQueue {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingQueue {
    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.requests().into_iter().map(|r| r.kind).collect()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl NotificationQueue for RecordingQueue {
    fn enqueue(&self, request: NotificationRequest) -> certainty_notify::error::Result<()> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

/// Queue whose consumer is gone.
pub struct ClosedQueue;

impl NotificationQueue for ClosedQueue {
    fn enqueue(&self, _request: NotificationRequest) -> certainty_notify::error::Result<()> {
        Err(NotifyError::QueueClosed)
    }
}

pub struct TestContext {
    pub temp_dir: TempDir,
    pub store: Arc<dyn MonitorStore>,
    pub inspector: Arc<ScriptedInspector>,
    pub queue: Arc<RecordingQueue>,
    pub engine: Arc<RefreshEngine>,
    pub service: Arc<MonitorService>,
    pub state: AppState,
    pub app: axum::Router,
}

impl TestContext {
    pub fn scheduler(&self) -> SweepScheduler {
        SweepScheduler::new(self.engine.clone(), self.store.clone(), 10, 10, 4)
    }
}

pub fn build_test_context() -> Result<TestContext> {
    certainty_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let store: Arc<dyn MonitorStore> = Arc::new(SqliteMonitorStore::new(temp_dir.path())?);
    let inspector = Arc::new(ScriptedInspector::default());
    let queue = Arc::new(RecordingQueue::default());

    let engine = Arc::new(RefreshEngine::new(
        store.clone(),
        inspector.clone(),
        queue.clone(),
    ));
    let service = Arc::new(MonitorService::new(store.clone(), queue.clone()));

    let config = ServerConfig {
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    };

    let state = AppState {
        engine: engine.clone(),
        service: service.clone(),
        config: Arc::new(config),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        store,
        inspector,
        queue,
        engine,
        service,
        state,
        app,
    })
}

pub fn whole_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap()
}

/// Certificate valid from 30 days ago until `days_left` days from now.
pub fn facts_expiring_in(serial: &str, days_left: i64) -> CertificateFacts {
    let now = whole_seconds(Utc::now());
    CertificateFacts {
        serial: serial.to_string(),
        not_before: now - Duration::days(30),
        not_after: now + Duration::days(days_left),
    }
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let req_body = match body {
        Some(body) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let req = builder.body(req_body).expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_text(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, String::from_utf8_lossy(&bytes).to_string())
}
