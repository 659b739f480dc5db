use std::sync::Arc;
use tokio::sync::Semaphore;

use super::AnalysisJob;

/// Launches analysis jobs as detached tasks, at most `max_concurrent`
/// executing at once. Jobs beyond the limit wait inside their own task,
/// so launching never blocks the caller.
#[derive(Clone)]
pub struct AnalysisRunner {
    job: Arc<AnalysisJob>,
    slots: Arc<Semaphore>,
}

impl AnalysisRunner {
    pub fn new(job: AnalysisJob, max_concurrent: usize) -> Self {
        Self {
            job: Arc::new(job),
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Fire-and-forget. The outcome is only observable through the store.
    pub fn launch(&self, submission_id: String) {
        let job = self.job.clone();
        let slots = self.slots.clone();
        tokio::spawn(async move {
            let _slot = match slots.acquire_owned().await {
                Ok(slot) => slot,
                Err(_) => {
                    tracing::error!(
                        "[analysis] Job pool closed, submission {} not analyzed",
                        submission_id
                    );
                    return;
                }
            };
            job.run(&submission_id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisReport, Analyzer, DelayRange, ScoreSimulator};
    use crate::db::{AnalysisStatus, DocumentStore, MemoryStore, NewSubmission};
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many analyses run at the same time.
    #[derive(Default)]
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for ConcurrencyProbe {
        async fn analyze(&self, text: &str) -> Result<AnalysisReport> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ScoreSimulator.simulate(text))
        }
    }

    async fn wait_until_settled(store: &MemoryStore, ids: &[String]) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let mut settled = true;
                for id in ids {
                    if !store.get_by_id(id).await.unwrap().analysis_status.is_terminal() {
                        settled = false;
                    }
                }
                if settled {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("jobs did not finish in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_pool_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let probe = Arc::new(ConcurrencyProbe::default());
        let runner = AnalysisRunner::new(
            AnalysisJob::new(store.clone(), probe.clone(), DelayRange::none()),
            2,
        );

        let mut ids = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("{}.doc", i));
            std::fs::write(&path, b"bytes").unwrap();
            let created = store
                .create(NewSubmission {
                    owner_id: "u1".into(),
                    title: format!("T{}", i),
                    abstract_text: "A".into(),
                    tags: vec!["x".into()],
                    supervisor: "S".into(),
                    file_path: path.to_string_lossy().into_owned(),
                    file_name: format!("{}.doc", i),
                    file_extension: "doc".into(),
                })
                .await
                .unwrap();
            runner.launch(created.id.clone());
            ids.push(created.id);
        }

        wait_until_settled(&store, &ids).await;

        assert!(probe.peak.load(Ordering::SeqCst) <= 2);
        for id in &ids {
            assert_eq!(
                store.get_by_id(id).await.unwrap().analysis_status,
                AnalysisStatus::Completed
            );
        }
    }
}
