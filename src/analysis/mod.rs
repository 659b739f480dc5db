mod job;
mod reconcile;
mod remote;
mod runner;
mod simulator;

pub use job::{AnalysisJob, DelayRange};
pub use reconcile::{resume_pending, StaleAnalysisSweeper};
pub use remote::RemoteAnalyzer;
pub use runner::AnalysisRunner;
pub use simulator::ScoreSimulator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Quality metrics for one document. Scores are percentages in 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub plagiarism_score: i32,
    pub grammar_score: i32,
    pub details: AnalysisDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub plagiarism: PlagiarismDetails,
    pub grammar: GrammarDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismDetails {
    pub summary: String,
    pub matched_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarDetails {
    pub errors_found: u32,
    pub suggestions: Vec<String>,
}

impl AnalysisDetails {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// Scores extracted document text. Implementations see nothing but the text.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalysisReport>;
}
