use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{AnalysisStatus, DocumentStore, NewSubmission, StatusUpdate, Submission};
use crate::error::{Error, Result};
use crate::storage::generate_submission_id;

/// Process-local store. Records keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, new: NewSubmission) -> Result<Submission> {
        new.validate()?;

        let now = Utc::now();
        let submission = Submission {
            id: generate_submission_id(),
            owner_id: new.owner_id,
            title: new.title,
            abstract_text: new.abstract_text,
            tags: new.tags,
            supervisor: new.supervisor,
            file_path: new.file_path,
            file_name: new.file_name,
            file_extension: new.file_extension,
            analysis_status: AnalysisStatus::PendingAnalysis,
            plagiarism_score: 0,
            grammar_score: 0,
            analysis_details: Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        };

        self.records.write().await.push(submission.clone());
        Ok(submission)
    }

    async fn get_by_id(&self, id: &str) -> Result<Submission> {
        self.records
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<Submission> {
        // Holding the write lock across check and apply keeps readers from
        // observing a half-applied update.
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(next) = update.status {
            if !record.analysis_status.can_transition_to(next) {
                return Err(Error::InvalidTransition {
                    id: id.to_string(),
                    from: record.analysis_status,
                    to: next,
                });
            }
        }

        update.apply(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list_by_status(
        &self,
        status: AnalysisStatus,
        updated_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|s| s.analysis_status == status)
            .filter(|s| updated_before.map_or(true, |cutoff| s.updated_at < cutoff))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_submission(owner: &str, title: &str) -> NewSubmission {
        NewSubmission {
            owner_id: owner.into(),
            title: title.into(),
            abstract_text: "An abstract".into(),
            tags: vec!["x".into(), "y".into()],
            supervisor: "Dr. S".into(),
            file_path: "/tmp/uploads/a.pdf".into(),
            file_name: "thesis.pdf".into(),
            file_extension: "pdf".into(),
        }
    }

    #[tokio::test]
    async fn create_starts_pending_with_zeroed_analysis() {
        let store = MemoryStore::new();
        let created = store.create(new_submission("u1", "T")).await.unwrap();

        assert_eq!(created.analysis_status, AnalysisStatus::PendingAnalysis);
        assert_eq!(created.plagiarism_score, 0);
        assert_eq!(created.grammar_score, 0);
        assert_eq!(created.analysis_details, serde_json::json!({}));
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched.title, "T");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let store = MemoryStore::new();
        let mut incomplete = new_submission("u1", "");
        incomplete.abstract_text.clear();

        let err = store.create(incomplete).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_by_id("missing").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store
                .update_status("missing", StatusUpdate::status(AnalysisStatus::Analyzing))
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_by_owner_keeps_insertion_order() {
        let store = MemoryStore::new();
        store.create(new_submission("u1", "first")).await.unwrap();
        store.create(new_submission("u2", "other")).await.unwrap();
        store.create(new_submission("u1", "second")).await.unwrap();

        let titles: Vec<String> = store
            .list_by_owner("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert!(store.list_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_rejects_backward_transitions() {
        let store = MemoryStore::new();
        let id = store.create(new_submission("u1", "T")).await.unwrap().id;

        store
            .update_status(&id, StatusUpdate::status(AnalysisStatus::Analyzing))
            .await
            .unwrap();
        let done = store
            .update_status(&id, StatusUpdate::completed(20, 85, serde_json::json!({"k": 1})))
            .await
            .unwrap();
        assert_eq!(done.analysis_status, AnalysisStatus::Completed);
        assert_eq!(done.plagiarism_score, 20);
        assert!(done.updated_at >= done.created_at);

        let err = store
            .update_status(&id, StatusUpdate::status(AnalysisStatus::Analyzing))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: AnalysisStatus::Completed,
                to: AnalysisStatus::Analyzing,
                ..
            }
        ));
        let unchanged = store.get_by_id(&id).await.unwrap();
        assert_eq!(unchanged.analysis_status, AnalysisStatus::Completed);
        assert_eq!(unchanged.grammar_score, 85);
    }

    #[tokio::test]
    async fn readers_never_see_half_applied_updates() {
        let store = Arc::new(MemoryStore::new());
        let id = store.create(new_submission("u1", "T")).await.unwrap().id;
        store
            .update_status(&id, StatusUpdate::status(AnalysisStatus::Analyzing))
            .await
            .unwrap();

        let reader = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let s = store.get_by_id(&id).await.unwrap();
                    let completed = s.analysis_status == AnalysisStatus::Completed;
                    assert_eq!(completed, s.plagiarism_score == 17);
                    assert_eq!(completed, s.grammar_score == 77);
                    tokio::task::yield_now().await;
                }
            })
        };

        store
            .update_status(&id, StatusUpdate::completed(17, 77, serde_json::json!({})))
            .await
            .unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn list_by_status_filters_on_age() {
        let store = MemoryStore::new();
        let id = store.create(new_submission("u1", "T")).await.unwrap().id;
        store
            .update_status(&id, StatusUpdate::status(AnalysisStatus::Analyzing))
            .await
            .unwrap();

        let all = store
            .list_by_status(AnalysisStatus::Analyzing, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let past = Utc::now() - chrono::Duration::hours(1);
        let stale = store
            .list_by_status(AnalysisStatus::Analyzing, Some(past))
            .await
            .unwrap();
        assert!(stale.is_empty());
        assert!(store
            .list_by_status(AnalysisStatus::PendingAnalysis, None)
            .await
            .unwrap()
            .is_empty());
    }
}
