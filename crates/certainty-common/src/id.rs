//! Monitor identifiers.
//!
//! Ids are Snowflake integers rendered as decimal strings. They are opaque to
//! callers and safe to embed in URLs.

use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, MutexGuard};

struct Generator {
    machine_id: i32,
    node_id: i32,
    bucket: SnowflakeIdBucket,
}

static GENERATOR: Mutex<Option<Generator>> = Mutex::new(None);

fn generator() -> MutexGuard<'static, Option<Generator>> {
    GENERATOR.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Configures the generator for this process.
///
/// `machine_id` and `node_id` must each be in `0..32`. Repeating a call with
/// the same pair keeps the running sequence, so ids stay unique.
pub fn init(machine_id: i32, node_id: i32) {
    let mut guard = generator();
    if let Some(existing) = guard.as_ref() {
        if existing.machine_id == machine_id && existing.node_id == node_id {
            return;
        }
    }
    *guard = Some(Generator {
        machine_id,
        node_id,
        bucket: SnowflakeIdBucket::new(machine_id, node_id),
    });
}

/// Returns a fresh monitor id.
pub fn next_id() -> String {
    let mut guard = generator();
    let generator = guard.get_or_insert_with(|| Generator {
        machine_id: 1,
        node_id: 1,
        bucket: SnowflakeIdBucket::new(1, 1),
    });
    generator.bucket.get_id().to_string()
}
