// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Run summarization
//!
//! Reduces terminal step records into an overall score, a bounded list of key
//! findings, and deduplicated priority recommendations. Order follows step
//! execution order; no weighting or re-ranking.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::pipeline::{StepProgress, StepStatus};

const MAX_FINDINGS: usize = 10;
const MAX_RECOMMENDATIONS: usize = 15;

/// Summary derived from a run's terminal step records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Arithmetic mean of the scoring steps' numeric scores. Steps with no
    /// numeric score are excluded; zero scoring steps yields 0.0.
    pub overall_score: f64,

    /// Up to 10 findings, in step-output order
    pub key_findings: Vec<String>,

    /// Up to 15 deduplicated recommendations, in step-output order
    pub priority_recommendations: Vec<String>,

    /// Steps that ran and failed (or were short-circuited), surfaced as a
    /// gap rather than an error
    pub failed_steps: Vec<String>,
}

/// Summarize a slice of terminal step records
pub fn summarize(steps: &[StepProgress]) -> RunSummary {
    let mut scores = Vec::new();
    let mut key_findings = Vec::new();
    let mut recommendations = Vec::new();
    let mut seen_recommendations = HashSet::new();
    let mut failed_steps = Vec::new();

    for step in steps {
        if step.status == StepStatus::Failed {
            failed_steps.push(step.step_id.clone());
            continue;
        }

        let Some(result) = &step.result else {
            continue;
        };

        if let Some(score) = numeric_score(result) {
            scores.push(score);
        }

        for finding in string_list(result, &["keyFindings", "findings"]) {
            if key_findings.len() < MAX_FINDINGS {
                key_findings.push(finding);
            }
        }

        for rec in string_list(result, &["recommendations", "priorityRecommendations"]) {
            if recommendations.len() < MAX_RECOMMENDATIONS && seen_recommendations.insert(rec.clone())
            {
                recommendations.push(rec);
            }
        }
    }

    let overall_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    RunSummary {
        overall_score,
        key_findings,
        priority_recommendations: recommendations,
        failed_steps,
    }
}

/// Pull a numeric `score` field out of a structured result
fn numeric_score(result: &Value) -> Option<f64> {
    result.get("score").and_then(Value::as_f64)
}

/// Collect string entries from the first present list field
fn string_list(result: &Value, keys: &[&str]) -> Vec<String> {
    for key in keys {
        if let Some(items) = result.get(key).and_then(Value::as_array) {
            return items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed(id: &str, result: Value) -> StepProgress {
        let mut step = StepProgress::pending(id);
        step.start();
        step.complete(result);
        step
    }

    fn failed(id: &str) -> StepProgress {
        let mut step = StepProgress::pending(id);
        step.start();
        step.fail("boom");
        step
    }

    #[test]
    fn test_mean_excludes_unscored_steps() {
        let steps = vec![
            completed("a", json!({"score": 80.0})),
            completed("b", json!({"score": 60.0})),
            completed("c", json!({"notes": "no score here"})),
        ];

        let summary = summarize(&steps);
        assert!((summary.overall_score - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_scoring_steps_is_zero() {
        let steps = vec![completed("a", json!({"notes": "text"}))];
        let summary = summarize(&steps);
        assert_eq!(summary.overall_score, 0.0);
    }

    #[test]
    fn test_findings_capped_at_ten() {
        let findings: Vec<String> = (0..12).map(|i| format!("finding {i}")).collect();
        let steps = vec![completed("a", json!({ "keyFindings": findings }))];

        let summary = summarize(&steps);
        assert_eq!(summary.key_findings.len(), 10);
        assert_eq!(summary.key_findings[0], "finding 0");
    }

    #[test]
    fn test_recommendations_deduplicated_in_order() {
        let steps = vec![
            completed("a", json!({"recommendations": ["fix titles", "add alt text"]})),
            completed("b", json!({"recommendations": ["fix titles", "compress images"]})),
        ];

        let summary = summarize(&steps);
        assert_eq!(
            summary.priority_recommendations,
            vec!["fix titles", "add alt text", "compress images"]
        );
    }

    #[test]
    fn test_failed_steps_surfaced_as_gap() {
        let steps = vec![completed("a", json!({"score": 50.0})), failed("b")];

        let summary = summarize(&steps);
        assert_eq!(summary.failed_steps, vec!["b"]);
        assert_eq!(summary.overall_score, 50.0);
    }
}
