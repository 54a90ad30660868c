//! Recording of link visits.

use shortener_db::Db;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::usage_db;

/// Records usage events as detached tasks.
///
/// Each event is written at most once. The outcome is never reported back to the request
/// that caused it: success is logged at debug level and a lost write at warn level.
#[derive(Clone)]
pub struct UsageRecorder<D> {
    db: D,
}

impl<D: Db + Clone> UsageRecorder<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Spawn the write. Callers are free to drop the handle.
    pub fn record(&self, link_id: String) -> JoinHandle<()> {
        let db = self.db.clone();

        tokio::spawn(async move {
            match usage_db::insert_usage(&db, &link_id, OffsetDateTime::now_utc()).await {
                Ok(usage) => debug!(link_id, usage_id = usage.id, "recorded link usage"),
                Err(err) => warn!(?err, link_id, "failed to record link usage, event dropped"),
            }
        })
    }
}
