use crate::services::scratch::ScratchStorage;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

const SWEEP_INTERVAL_SECS: u64 = 900;

/// Background task deleting scratch files that outlived their request, e.g.
/// after a crash mid-request.
pub struct ScratchSweeper {
    storage: Arc<ScratchStorage>,
    max_age_hours: u64,
    shutdown: watch::Receiver<bool>,
}

impl ScratchSweeper {
    pub fn new(
        storage: Arc<ScratchStorage>,
        max_age_hours: u64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            storage,
            max_age_hours,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Scratch sweeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Scratch sweeper shutting down");
                    break;
                }
                _ = sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)) => {
                    self.perform_sweep().await;
                }
            }
        }
    }

    async fn perform_sweep(&self) {
        tracing::info!("🧹 Sweeping stale scratch files...");

        let cutoff = Utc::now() - chrono::Duration::hours(self.max_age_hours as i64);
        let removed = self.storage.sweep_older_than(cutoff).await;

        tracing::info!("✅ Scratch sweep completed ({} file(s) removed)", removed);
    }
}
