use async_trait::async_trait;
use rand::Rng;
use std::ops::Range;

use super::{AnalysisDetails, AnalysisReport, Analyzer, GrammarDetails, PlagiarismDetails};
use crate::error::Result;

pub const PLAGIARISM_RANGE: Range<i32> = 5..35;
pub const GRAMMAR_RANGE: Range<i32> = 70..90;

/// Placeholder analyzer producing random scores in fixed ranges.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreSimulator;

impl ScoreSimulator {
    pub fn simulate(&self, _text: &str) -> AnalysisReport {
        let mut rng = rand::rng();
        AnalysisReport {
            plagiarism_score: rng.random_range(PLAGIARISM_RANGE),
            grammar_score: rng.random_range(GRAMMAR_RANGE),
            details: AnalysisDetails {
                plagiarism: PlagiarismDetails {
                    summary: "Simulated overlap detected in the introduction and conclusion sections."
                        .to_string(),
                    matched_sources: vec!["Source A".to_string(), "Source B".to_string()],
                },
                grammar: GrammarDetails {
                    errors_found: 5,
                    suggestions: vec![
                        "Check subject-verb agreement.".to_string(),
                        "Improve sentence structure.".to_string(),
                    ],
                },
            },
        }
    }
}

#[async_trait]
impl Analyzer for ScoreSimulator {
    async fn analyze(&self, text: &str) -> Result<AnalysisReport> {
        Ok(self.simulate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_stay_in_documented_ranges() {
        let simulator = ScoreSimulator;
        for _ in 0..500 {
            let report = simulator.simulate("some thesis text");
            assert!(PLAGIARISM_RANGE.contains(&report.plagiarism_score));
            assert!(GRAMMAR_RANGE.contains(&report.grammar_score));
        }
    }

    #[test]
    fn details_have_fixed_shape() {
        let details = ScoreSimulator.simulate("").details.to_value();
        assert!(details["plagiarism"]["summary"].is_string());
        assert_eq!(details["plagiarism"]["matched_sources"].as_array().unwrap().len(), 2);
        assert_eq!(details["grammar"]["errors_found"], 5);
        assert_eq!(details["grammar"]["suggestions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn analyzer_impl_never_fails() {
        let report = ScoreSimulator.analyze("").await.unwrap();
        assert!(PLAGIARISM_RANGE.contains(&report.plagiarism_score));
    }
}
