use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{AnalysisReport, Analyzer};
use crate::db::{AnalysisStatus, SharedStore, StatusUpdate, Submission};
use crate::error::{Error, Result};
use crate::{extract, storage};

/// Inclusive bounds for the simulated analyzer latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min.min(max)),
            max: Duration::from_secs(min.max(max)),
        }
    }

    #[cfg(test)]
    pub fn none() -> Self {
        Self::from_secs(0, 0)
    }

    fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = rand::rng().random_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Drives one submission from `pending_analysis` to a terminal state.
pub struct AnalysisJob {
    store: SharedStore,
    analyzer: Arc<dyn Analyzer>,
    delay: DelayRange,
}

impl AnalysisJob {
    pub fn new(store: SharedStore, analyzer: Arc<dyn Analyzer>, delay: DelayRange) -> Self {
        Self {
            store,
            analyzer,
            delay,
        }
    }

    /// Runs the job to completion. Errors never escape; they end in a
    /// `failed` record and a log line.
    pub async fn run(&self, submission_id: &str) {
        info!("[analysis] Starting analysis for submission {}", submission_id);

        match self.drive(submission_id).await {
            Ok(Some(done)) => info!(
                "[analysis] Completed submission {}: plagiarism {}%, grammar {}%",
                done.id, done.plagiarism_score, done.grammar_score
            ),
            Ok(None) => {}
            Err(e) => {
                error!("[analysis] Submission {} failed: {}", submission_id, e);
                self.mark_failed(submission_id).await;
            }
        }
    }

    /// `Ok(None)` means the job had nothing to do.
    async fn drive(&self, submission_id: &str) -> Result<Option<Submission>> {
        match self.store.get_by_id(submission_id).await {
            Ok(existing) if existing.analysis_status.is_terminal() => {
                debug!(
                    "[analysis] Submission {} is already {}, skipping",
                    submission_id, existing.analysis_status
                );
                return Ok(None);
            }
            Ok(_) => {}
            Err(Error::NotFound(_)) => {
                debug!("[analysis] Submission {} no longer exists, skipping", submission_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        // Each phase works from the record the store hands back, never from
        // a copy held across an await.
        let record = match self
            .store
            .update_status(submission_id, StatusUpdate::status(AnalysisStatus::Analyzing))
            .await
        {
            Ok(record) => record,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(Error::InvalidTransition { from, .. }) => {
                warn!(
                    "[analysis] Submission {} is already {}, leaving it alone",
                    submission_id, from
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let bytes = storage::read_file(&record.file_path).await?;
        let text = extract::extract_blocking(&record.file_extension, bytes).await?;
        debug!(
            "[analysis] Extracted {} chars from {}: {:?}",
            text.chars().count(),
            record.file_name,
            text.chars().take(200).collect::<String>()
        );

        let report: AnalysisReport = self.analyzer.analyze(&text).await?;

        let delay = self.delay.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let done = self
            .store
            .update_status(
                submission_id,
                StatusUpdate::completed(
                    report.plagiarism_score,
                    report.grammar_score,
                    report.details.to_value(),
                ),
            )
            .await?;
        Ok(Some(done))
    }

    async fn mark_failed(&self, submission_id: &str) {
        if let Err(e) = self
            .store
            .update_status(submission_id, StatusUpdate::status(AnalysisStatus::Failed))
            .await
        {
            // Nothing else to try; the sweeper reconciles records left in `analyzing`.
            error!(
                "[analysis] Could not mark submission {} as failed: {}",
                submission_id, e
            );
        }
    }
}
