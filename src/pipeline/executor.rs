// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Step executor
//!
//! Runs a step set in dependency order, enforcing per-step timeouts,
//! emitting progress through a caller-supplied channel, and applying the
//! critical/non-critical failure policy.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clients::{PageExtractor, TextGenerator};
use crate::errors::SiteflowError;
use crate::pipeline::template::{self, TemplateContext};
use crate::pipeline::{
    summarize, OutputFormat, PipelineRun, Step, StepDag, StepKind, StepProgress,
};

/// Per-run progress channel. Unbounded so a slow consumer can never distort
/// the executor's timeout accounting; sends are fire-and-forget.
pub type ProgressSender = mpsc::UnboundedSender<StepProgress>;

/// Create a progress channel pair for one run
pub fn progress_channel() -> (ProgressSender, mpsc::UnboundedReceiver<StepProgress>) {
    mpsc::unbounded_channel()
}

/// Raw output of an external call, before format interpretation
enum RawOutput {
    /// Already-structured value (content extraction)
    Value(Value),
    /// Free text from the generative-text collaborator
    Text(String),
}

/// Executes step sets against the external collaborators
pub struct StepExecutor {
    generator: Arc<dyn TextGenerator>,
    extractor: Arc<dyn PageExtractor>,
}

impl StepExecutor {
    pub fn new(generator: Arc<dyn TextGenerator>, extractor: Arc<dyn PageExtractor>) -> Self {
        Self { generator, extractor }
    }

    /// Execute a step set for one target URL.
    ///
    /// Steps run in a topological pass. A non-critical failure is recorded
    /// and its transitive dependents are short-circuited without invoking
    /// their external calls; a critical failure aborts the run with no
    /// further steps started.
    pub async fn execute(
        &self,
        steps: &[Step],
        url: &str,
        ctx: &TemplateContext,
        progress: Option<&ProgressSender>,
    ) -> Result<PipelineRun, SiteflowError> {
        let start = Instant::now();

        let dag = StepDag::build(steps)?;
        let order = dag.topological_order()?;

        let mut completed: HashMap<String, Value> = HashMap::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut records: Vec<StepProgress> = Vec::with_capacity(order.len());

        for idx in order {
            let step = &steps[idx];
            let mut record = StepProgress::pending(&step.id);
            emit(progress, &record);

            // Dependency gating: a failed dependency short-circuits this
            // step; a dependency absent from both maps is a configuration
            // fault (the DAG should have made that impossible).
            let failed_dep = step.depends_on.iter().find(|d| failed.contains(*d));
            if let Some(dep) = failed_dep {
                debug!(step = %step.id, dependency = %dep, "short-circuiting step");
                record.fail(format!("skipped: dependency '{dep}' failed"));
                emit(progress, &record);
                failed.insert(step.id.clone());
                records.push(record);
                continue;
            }
            if let Some(dep) = step
                .depends_on
                .iter()
                .find(|d| !completed.contains_key(*d))
            {
                return Err(SiteflowError::MissingDependency {
                    step: step.id.clone(),
                    dependency: dep.clone(),
                });
            }

            // Render the prompt before touching the network. A missing
            // required placeholder aborts the run as a configuration error.
            let prompt = match step.kind {
                StepKind::Generation => {
                    template::render(&step.id, &step.prompt_template, ctx, &completed)?
                }
                StepKind::Extraction { .. } => String::new(),
            };

            record.start();
            emit(progress, &record);

            let outcome = self
                .invoke(step, &prompt, &mut record, progress)
                .await
                .and_then(|raw| interpret(step, raw));

            match outcome {
                Ok(value) => {
                    record.complete(value.clone());
                    emit(progress, &record);
                    completed.insert(step.id.clone(), value);
                    records.push(record);
                }
                Err(err) => {
                    warn!(step = %step.id, error = %err, "step failed");
                    record.fail(err.to_string());
                    emit(progress, &record);
                    records.push(record);

                    if step.critical {
                        // No further steps are started.
                        return Err(err);
                    }
                    failed.insert(step.id.clone());
                }
            }
        }

        let summary = summarize(&records);

        Ok(PipelineRun {
            url: url.to_string(),
            steps: records,
            summary,
            total_duration: start.elapsed(),
        })
    }

    /// Run one step's external call under its timeout, emitting synthetic
    /// intermediate progress while waiting. Timeout expiry drops the call
    /// future, which cancels the underlying request without touching
    /// sibling steps.
    async fn invoke(
        &self,
        step: &Step,
        prompt: &str,
        record: &mut StepProgress,
        progress: Option<&ProgressSender>,
    ) -> Result<RawOutput, SiteflowError> {
        let call = async {
            match &step.kind {
                StepKind::Extraction { url } => {
                    self.extractor.extract(url).await.map(|s| RawOutput::Value(s.to_value()))
                }
                StepKind::Generation => {
                    self.generator.generate(prompt).await.map(RawOutput::Text)
                }
            }
        };
        tokio::pin!(call);

        let deadline = tokio::time::sleep(step.timeout);
        tokio::pin!(deadline);

        // Advisory cadence: ten ticks across the expected duration, capped
        // below completion so the bar never lies about being done.
        let tick = (step.expected_duration / 10).max(Duration::from_millis(100));
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // first tick resolves immediately

        loop {
            tokio::select! {
                result = &mut call => return result,
                _ = &mut deadline => {
                    return Err(SiteflowError::StepTimeout {
                        step: step.id.clone(),
                        timeout: step.timeout,
                    });
                }
                _ = ticker.tick() => {
                    record.advance(record.progress.saturating_add(9).min(90));
                    emit(progress, record);
                }
            }
        }
    }
}

/// Fire-and-forget progress emission. A closed receiver is not an error.
fn emit(progress: Option<&ProgressSender>, record: &StepProgress) {
    if let Some(sender) = progress {
        let _ = sender.send(record.clone());
    }
}

/// Interpret a raw external result according to the step's output format
fn interpret(step: &Step, raw: RawOutput) -> Result<Value, SiteflowError> {
    match raw {
        RawOutput::Value(value) => Ok(value),
        RawOutput::Text(text) => match step.output_format {
            OutputFormat::Text => Ok(Value::String(text)),
            OutputFormat::Structured => parse_structured(&step.id, &text),
            // Lenient-input concession: structured first, raw text only on
            // parse failure, never on semantic content.
            OutputFormat::Hybrid => {
                parse_structured(&step.id, &text).or(Ok(Value::String(text)))
            }
        },
    }
}

/// Parse structured JSON output, stripping a markdown code fence first
fn parse_structured(step_id: &str, text: &str) -> Result<Value, SiteflowError> {
    let body = strip_code_fence(text);
    serde_json::from_str(body).map_err(|e| SiteflowError::ParseError {
        step: step_id.to_string(),
        message: e.to_string(),
    })
}

/// Strip a surrounding ```/```json markdown fence, if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", or empty) up to the newline
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}
