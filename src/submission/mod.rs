use serde::Deserialize;

use crate::analysis::AnalysisRunner;
use crate::auth::Requester;
use crate::db::{NewSubmission, SharedStore, Submission, SubmissionSummary};
use crate::error::{Error, Result};
use crate::storage::{self, StagedFile};

/// Descriptive fields as they arrive from the intake layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionMetadata {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Comma-separated.
    pub tags: Option<String>,
    pub supervisor: Option<String>,
}

impl SubmissionMetadata {
    fn missing_fields(&self) -> Vec<&'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let mut missing = Vec::new();
        if !present(&self.title) {
            missing.push("title");
        }
        if !present(&self.abstract_text) {
            missing.push("abstract");
        }
        if parse_tags(self.tags.as_deref().unwrap_or_default()).is_empty() {
            missing.push("tags");
        }
        if !present(&self.supervisor) {
            missing.push("supervisor");
        }
        missing
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct SubmissionService {
    store: SharedStore,
    runner: AnalysisRunner,
}

impl SubmissionService {
    pub fn new(store: SharedStore, runner: AnalysisRunner) -> Self {
        Self { store, runner }
    }

    /// Validates and stores a submission, then launches its analysis without
    /// waiting for it. A staged file is removed on every failure path.
    pub async fn submit(
        &self,
        owner_id: &str,
        metadata: SubmissionMetadata,
        file: Option<StagedFile>,
    ) -> Result<SubmissionSummary> {
        let Some(file) = file else {
            return Err(Error::Validation("no document file uploaded".to_string()));
        };

        let missing = metadata.missing_fields();
        if !missing.is_empty() {
            storage::discard_staged(&file).await;
            return Err(Error::Validation(format!(
                "please fill in all required fields (missing: {})",
                missing.join(", ")
            )));
        }

        let new = NewSubmission {
            owner_id: owner_id.to_string(),
            title: trimmed(metadata.title),
            abstract_text: trimmed(metadata.abstract_text),
            tags: parse_tags(metadata.tags.as_deref().unwrap_or_default()),
            supervisor: trimmed(metadata.supervisor),
            file_path: file.path.to_string_lossy().into_owned(),
            file_name: file.original_name.clone(),
            file_extension: file.extension(),
        };

        let created = match self.store.create(new).await {
            Ok(created) => created,
            Err(e) => {
                storage::discard_staged(&file).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Stored submission {} ({}) for owner {}, analysis queued",
            created.id,
            created.file_name,
            created.owner_id
        );
        self.runner.launch(created.id.clone());

        Ok(created.summary())
    }

    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Submission>> {
        self.store.list_by_owner(owner_id).await
    }

    pub async fn get_for_requester(&self, id: &str, requester: &Requester) -> Result<Submission> {
        let submission = self.store.get_by_id(id).await?;
        if !requester.can_view(&submission.owner_id) {
            return Err(Error::Forbidden(id.to_string()));
        }
        Ok(submission)
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
