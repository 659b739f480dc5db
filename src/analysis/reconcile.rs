//! Recovery for records whose job never reached a terminal state.

use chrono::Utc;
use std::time::Duration;
use tokio::time::interval;

use super::AnalysisRunner;
use crate::db::{AnalysisStatus, SharedStore, StatusUpdate};
use crate::error::{Error, Result};

/// Periodically fails records that have sat in `analyzing` longer than
/// `stale_after`. A job that finishes afterwards is refused by the store,
/// since `failed` is terminal.
pub struct StaleAnalysisSweeper {
    store: SharedStore,
    stale_after: Duration,
    interval: Duration,
}

impl StaleAnalysisSweeper {
    pub fn new(store: SharedStore, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            stale_after,
            interval,
        }
    }

    /// One pass. Returns how many records were failed.
    pub async fn sweep(&self) -> Result<usize> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .map_err(|e| Error::Validation(format!("stale threshold out of range: {}", e)))?;
        let cutoff = Utc::now() - stale_after;

        let stale = self
            .store
            .list_by_status(AnalysisStatus::Analyzing, Some(cutoff))
            .await?;

        let mut failed = 0;
        for record in stale {
            match self
                .store
                .update_status(&record.id, StatusUpdate::status(AnalysisStatus::Failed))
                .await
            {
                Ok(_) => {
                    tracing::warn!(
                        "[sweeper] Submission {} stuck in analyzing since {}, marked failed",
                        record.id,
                        record.updated_at
                    );
                    failed += 1;
                }
                // Finished or vanished between the listing and the write.
                Err(Error::InvalidTransition { .. }) | Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(failed)
    }

    /// Sweeps every `interval` until the process exits.
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        tracing::info!(
            "[sweeper] Started (stale after {:?}, interval {:?})",
            self.stale_after,
            self.interval
        );

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => tracing::debug!("[sweeper] Nothing stale"),
                Ok(n) => tracing::info!("[sweeper] Failed {} stale submissions", n),
                Err(e) => tracing::error!("[sweeper] Sweep failed: {}", e),
            }
        }
    }
}

/// Relaunches every `pending_analysis` record. Only safe at startup, when
/// no job for them can exist yet.
pub async fn resume_pending(store: &SharedStore, runner: &AnalysisRunner) -> Result<usize> {
    let pending = store
        .list_by_status(AnalysisStatus::PendingAnalysis, None)
        .await?;
    let count = pending.len();
    for record in pending {
        runner.launch(record.id);
    }
    if count > 0 {
        tracing::info!("[analysis] Resumed {} pending submissions", count);
    }
    Ok(count)
}
