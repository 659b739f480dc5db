use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{AnalysisDetails, AnalysisReport, Analyzer, GrammarDetails, PlagiarismDetails};
use crate::error::{Error, Result};

/// The analysis service only looks at the head of a document.
const MAX_TEXT_CHARS: usize = 4000;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
/// Plagiarism and grammar, called one after the other.
const ENDPOINT_CALLS: u32 = 2;

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlagiarismResponse {
    originality_score: f64,
    feedback: String,
    #[serde(default)]
    matched_sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GrammarResponse {
    grammar_score: f64,
    #[serde(default)]
    errors_found: u32,
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Delegates scoring to an external HTTP analysis service.
pub struct RemoteAnalyzer {
    client: Client,
    base_url: String,
    initial_backoff: Duration,
}

impl RemoteAnalyzer {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Analyzer(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Longest one `analyze` call can take when every attempt times out.
    pub fn worst_case_duration() -> Duration {
        let backoff: Duration = (0..MAX_RETRIES - 1)
            .map(|retry| INITIAL_BACKOFF * 2u32.pow(retry))
            .sum();
        (REQUEST_TIMEOUT * MAX_RETRIES + backoff) * ENDPOINT_CALLS
    }

    #[cfg(test)]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, text: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            attempt += 1;
            let outcome = self
                .client
                .post(&url)
                .json(&TextRequest { text })
                .send()
                .await;

            let retryable = match outcome {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| Error::Analyzer(format!("{}: invalid response: {}", url, e)));
                }
                Ok(response) if response.status().is_server_error() => {
                    format!("{} returned {}", url, response.status())
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Analyzer(format!("{} returned {}: {}", url, status, body)));
                }
                Err(e) => format!("request to {} failed: {}", url, e),
            };

            if attempt >= MAX_RETRIES {
                return Err(Error::Analyzer(format!(
                    "{} (after {} attempts)",
                    retryable, attempt
                )));
            }
            warn!("{}; retrying in {:?}", retryable, backoff);
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

#[async_trait]
impl Analyzer for RemoteAnalyzer {
    async fn analyze(&self, text: &str) -> Result<AnalysisReport> {
        let sample = truncate_chars(text, MAX_TEXT_CHARS);
        info!(
            "Requesting remote analysis ({} of {} chars)",
            sample.chars().count(),
            text.chars().count()
        );

        let plagiarism: PlagiarismResponse = self.post("/api/ai/plagiarism", sample).await?;
        let grammar: GrammarResponse = self.post("/api/ai/grammar", sample).await?;

        Ok(AnalysisReport {
            plagiarism_score: to_percent(100.0 - plagiarism.originality_score),
            grammar_score: to_percent(grammar.grammar_score),
            details: AnalysisDetails {
                plagiarism: PlagiarismDetails {
                    summary: plagiarism.feedback,
                    matched_sources: plagiarism.matched_sources,
                },
                grammar: GrammarDetails {
                    errors_found: grammar.errors_found,
                    suggestions: grammar.suggestions,
                },
            },
        })
    }
}

fn to_percent(score: f64) -> i32 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as i32
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
