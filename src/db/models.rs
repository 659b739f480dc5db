use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Uploaded,
    PendingAnalysis,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Uploaded => "uploaded",
            AnalysisStatus::PendingAnalysis => "pending_analysis",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// States from which `self` may be entered. Lifecycle only moves forward.
    pub fn allowed_predecessors(&self) -> &'static [AnalysisStatus] {
        use AnalysisStatus::*;
        match self {
            Uploaded => &[],
            PendingAnalysis => &[Uploaded],
            Analyzing => &[Uploaded, PendingAnalysis],
            Completed => &[Analyzing],
            Failed => &[Uploaded, PendingAnalysis, Analyzing],
        }
    }

    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(AnalysisStatus::Uploaded),
            "pending_analysis" => Ok(AnalysisStatus::PendingAnalysis),
            "analyzing" => Ok(AnalysisStatus::Analyzing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(Error::Store(format!("unknown analysis status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub tags: Vec<String>,
    pub supervisor: String,
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub analysis_status: AnalysisStatus,
    pub plagiarism_score: i32,
    pub grammar_score: i32,
    pub analysis_details: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            analysis_status: self.analysis_status,
        }
    }
}

/// Row shape of the `submissions` table.
#[derive(Debug, FromRow)]
pub struct SubmissionRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub abstract_text: String,
    pub tags: Vec<String>,
    pub supervisor: String,
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub analysis_status: String,
    pub plagiarism_score: i32,
    pub grammar_score: i32,
    pub analysis_details: sqlx::types::Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = Error;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            analysis_status: row.analysis_status.parse()?,
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            abstract_text: row.abstract_text,
            tags: row.tags,
            supervisor: row.supervisor,
            file_path: row.file_path,
            file_name: row.file_name,
            file_extension: row.file_extension,
            plagiarism_score: row.plagiarism_score,
            grammar_score: row.grammar_score,
            analysis_details: row.analysis_details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields supplied by the Submission Service when persisting a new record.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub owner_id: String,
    pub title: String,
    pub abstract_text: String,
    pub tags: Vec<String>,
    pub supervisor: String,
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
}

impl NewSubmission {
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("owner", &self.owner_id),
            ("title", &self.title),
            ("abstract", &self.abstract_text),
            ("supervisor", &self.supervisor),
            ("file path", &self.file_path),
            ("file name", &self.file_name),
            ("file extension", &self.file_extension),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        if self.tags.is_empty() {
            return Err(Error::Validation("at least one tag is required".to_string()));
        }
        Ok(())
    }
}

/// Partial update of the analysis fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub status: Option<AnalysisStatus>,
    pub plagiarism_score: Option<i32>,
    pub grammar_score: Option<i32>,
    pub analysis_details: Option<Value>,
}

impl StatusUpdate {
    pub fn status(status: AnalysisStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn completed(plagiarism_score: i32, grammar_score: i32, details: Value) -> Self {
        Self {
            status: Some(AnalysisStatus::Completed),
            plagiarism_score: Some(plagiarism_score),
            grammar_score: Some(grammar_score),
            analysis_details: Some(details),
        }
    }

    pub fn apply(&self, submission: &mut Submission) {
        if let Some(status) = self.status {
            submission.analysis_status = status;
        }
        if let Some(score) = self.plagiarism_score {
            submission.plagiarism_score = score;
        }
        if let Some(score) = self.grammar_score {
            submission.grammar_score = score;
        }
        if let Some(ref details) = self.analysis_details {
            submission.analysis_details = details.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub title: String,
    pub analysis_status: AnalysisStatus,
}

/// What the query surface returns. Scores and details are withheld until
/// the analysis has completed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub tags: Vec<String>,
    pub supervisor: String,
    pub file_name: String,
    pub file_extension: String,
    pub analysis_status: AnalysisStatus,
    pub plagiarism_score: Option<i32>,
    pub grammar_score: Option<i32>,
    pub analysis_details: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionView {
    fn from(s: Submission) -> Self {
        let completed = s.analysis_status == AnalysisStatus::Completed;
        SubmissionView {
            plagiarism_score: completed.then_some(s.plagiarism_score),
            grammar_score: completed.then_some(s.grammar_score),
            analysis_details: completed.then_some(s.analysis_details),
            id: s.id,
            owner_id: s.owner_id,
            title: s.title,
            abstract_text: s.abstract_text,
            tags: s.tags,
            supervisor: s.supervisor,
            file_name: s.file_name,
            file_extension: s.file_extension,
            analysis_status: s.analysis_status,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
