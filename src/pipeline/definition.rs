// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Step and run definitions
//!
//! Defines the core data structures for analysis pipelines: immutable step
//! definitions, mutable per-step progress records, and the run aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::pipeline::summary::RunSummary;

/// What a step asks of the outside world
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepKind {
    /// Fetch and extract a single page's content
    Extraction { url: Url },

    /// Send a rendered prompt to the generative-text collaborator
    Generation,
}

/// How the raw textual result is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON expected, optionally fenced in a markdown code block.
    /// A parse failure is a step failure.
    Structured,
    /// No parsing, raw text kept as-is
    Text,
    /// Structured first, fall back to raw text only on parse failure
    Hybrid,
}

/// Immutable definition of one unit of pipeline work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step id (must be unique within a run)
    pub id: String,

    /// Prompt template with `{{placeholder}}` markers resolved from the run
    /// context and prior step results. Empty for extraction steps.
    pub prompt_template: String,

    /// External operation this step performs
    pub kind: StepKind,

    /// Interpretation of the raw result
    pub output_format: OutputFormat,

    /// Rough duration used to pace synthetic progress updates
    pub expected_duration: Duration,

    /// Hard deadline for the external call
    pub timeout: Duration,

    /// Step ids that must complete before this step runs
    pub depends_on: Vec<String>,

    /// A critical step's failure aborts the entire run
    pub critical: bool,
}

impl Step {
    /// Create a content-extraction step for a page
    pub fn extraction(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            prompt_template: String::new(),
            kind: StepKind::Extraction { url },
            output_format: OutputFormat::Structured,
            expected_duration: Duration::from_secs(8),
            timeout: Duration::from_secs(15),
            depends_on: Vec::new(),
            critical: false,
        }
    }

    /// Create a generative-text step
    pub fn generation(id: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_template: prompt_template.into(),
            kind: StepKind::Generation,
            output_format: OutputFormat::Structured,
            expected_duration: Duration::from_secs(20),
            timeout: Duration::from_secs(30),
            depends_on: Vec::new(),
            critical: false,
        }
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_expected_duration(mut self, expected: Duration) -> Self {
        self.expected_duration = expected;
        self
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// Lifecycle of one step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Mutable progress record for one in-flight or completed step.
///
/// Transitions are monotonic: once a step reaches a terminal status, further
/// transitions are ignored rather than regressing the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    pub step_id: String,
    pub status: StepStatus,
    /// Fractional progress, 0–100. Advisory only while running.
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Parsed result. `None` for a failed or short-circuited step, so
    /// consumers can tell "ran and failed" from "never attempted".
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl StepProgress {
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            progress: 0,
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
        }
    }

    /// Mark the step running
    pub fn start(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Bump advisory progress while the external call is in flight.
    /// Never reaches 100 on its own.
    pub fn advance(&mut self, progress: u8) {
        if self.status != StepStatus::Running {
            return;
        }
        self.progress = self.progress.max(progress.min(99));
    }

    /// Mark the step completed with its parsed result
    pub fn complete(&mut self, result: Value) {
        if self.status.is_terminal() {
            return;
        }
        self.status = StepStatus::Completed;
        self.progress = 100;
        self.ended_at = Some(Utc::now());
        self.result = Some(result);
    }

    /// Mark the step failed with an error message
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = StepStatus::Failed;
        self.ended_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

/// Aggregate result of a single executor invocation.
///
/// Owned by one invocation; every declared step appears in `steps`, in
/// execution order, with a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Target identifier
    pub url: String,

    /// Per-step progress records in execution order
    pub steps: Vec<StepProgress>,

    /// Summary derived from the terminal step records
    pub summary: RunSummary,

    /// Wall-clock duration of the run
    pub total_duration: Duration,
}

impl PipelineRun {
    /// Look up a step's result. Outer `None` means the step is unknown;
    /// inner `None` means it ran and failed.
    pub fn result(&self, step_id: &str) -> Option<Option<&Value>> {
        self.steps
            .iter()
            .find(|s| s.step_id == step_id)
            .map(|s| s.result.as_ref())
    }

    /// Ids of steps that reached `Failed`
    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| s.step_id.as_str())
            .collect()
    }

    /// Number of steps that completed successfully
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut progress = StepProgress::pending("extract");
        progress.start();
        progress.complete(json!({"ok": true}));

        progress.fail("late error");
        assert_eq!(progress.status, StepStatus::Completed);
        assert!(progress.error.is_none());

        let mut failed = StepProgress::pending("score");
        failed.start();
        failed.fail("timed out");
        failed.complete(json!({}));
        assert_eq!(failed.status, StepStatus::Failed);
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_advance_never_reaches_100() {
        let mut progress = StepProgress::pending("extract");
        progress.start();
        progress.advance(150);
        assert_eq!(progress.progress, 99);
    }

    #[test]
    fn test_advance_ignored_when_not_running() {
        let mut progress = StepProgress::pending("extract");
        progress.advance(50);
        assert_eq!(progress.progress, 0);
    }

    #[test]
    fn test_step_builders() {
        let step = Step::generation("score", "Rate {{page_text}}")
            .depends_on(["extract"])
            .critical()
            .with_timeout(Duration::from_secs(25));

        assert_eq!(step.id, "score");
        assert_eq!(step.depends_on, vec!["extract".to_string()]);
        assert!(step.critical);
        assert_eq!(step.timeout, Duration::from_secs(25));
    }
}
