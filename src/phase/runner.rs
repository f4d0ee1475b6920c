// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Phase state machine
//!
//! Groups steps into three independently invocable phases: collection,
//! framework scoring, and strategic synthesis. Each invocation loads prior
//! phase output from the store, fills gaps by re-deriving minimal missing
//! input, executes the requested phase, and writes back a merged record
//! plus advisory messages when it had to compensate for skipped phases.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;
use url::Url;

use crate::clients::{PageExtractor, PageSnapshot, TextGenerator};
use crate::config::TimeoutConfig;
use crate::discover::{discover, CandidatePage, DiscoveryOptions};
use crate::errors::SiteflowError;
use crate::phase::{
    FrameworkScore, Phase1Output, Phase2Output, Phase3Output, PhaseRecord, PhaseStatus,
};
use crate::pipeline::{
    PipelineRun, ProgressSender, Step, StepExecutor, StepKind, TemplateContext,
};
use crate::store::PhaseStore;

/// The four analytical frameworks scored in phase 2
pub const FRAMEWORKS: &[(&str, &str, &str)] = &[
    (
        "content_quality",
        "Content Quality",
        "depth, originality, and usefulness of the copy",
    ),
    (
        "seo_fundamentals",
        "SEO Fundamentals",
        "titles, meta descriptions, heading structure, and keyword coverage",
    ),
    (
        "messaging_clarity",
        "Messaging Clarity",
        "value proposition and audience fit of the messaging",
    ),
    (
        "conversion_readiness",
        "Conversion Readiness",
        "calls to action, trust signals, and friction in key flows",
    ),
];

/// A named, independently invocable phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseNumber {
    Collection,
    Scoring,
    Synthesis,
}

impl PhaseNumber {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Collection => 1,
            Self::Scoring => 2,
            Self::Synthesis => 3,
        }
    }
}

impl TryFrom<u8> for PhaseNumber {
    type Error = SiteflowError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Collection),
            2 => Ok(Self::Scoring),
            3 => Ok(Self::Synthesis),
            other => Err(SiteflowError::InvalidPhase {
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PhaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Collection => "collection",
            Self::Scoring => "framework scoring",
            Self::Synthesis => "strategic synthesis",
        };
        write!(f, "{name}")
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct PhaseOptions {
    /// Prior-state identifier. Absent creates a fresh record.
    pub record_id: Option<String>,

    /// Permit re-running a phase over a completed record, the
    /// regenerate-a-report workflow
    pub allow_rerun: bool,

    /// Discovery bounds for phase 1
    pub discovery: DiscoveryOptions,

    /// Per-step-class timeout overrides
    pub timeouts: TimeoutConfig,
}

/// Result of one phase invocation
#[derive(Debug)]
pub struct PhaseOutcome {
    /// Merged record as written back to the store
    pub record: PhaseRecord,

    /// Non-fatal messages explaining reduced output quality when earlier
    /// phases had to be compensated for
    pub advisories: Vec<String>,

    /// The executor run backing this phase
    pub run: PipelineRun,
}

/// Orchestrates phased analysis against the collaborators and the store
pub struct PhaseRunner {
    executor: StepExecutor,
    extractor: Arc<dyn PageExtractor>,
    store: Arc<dyn PhaseStore>,
}

impl PhaseRunner {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        extractor: Arc<dyn PageExtractor>,
        store: Arc<dyn PhaseStore>,
    ) -> Self {
        Self {
            executor: StepExecutor::new(generator, extractor.clone()),
            extractor,
            store,
        }
    }

    /// Run one phase against a (possibly pre-existing) record.
    ///
    /// Persistence failures are fatal: the resumability guarantee depends on
    /// durable state, so there is no silent continuation without it.
    pub async fn run(
        &self,
        phase: PhaseNumber,
        url: &Url,
        options: &PhaseOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<PhaseOutcome, SiteflowError> {
        let mut record = match &options.record_id {
            Some(id) => self
                .store
                .get(id)
                .await?
                .ok_or_else(|| SiteflowError::RecordNotFound { id: id.clone() })?,
            None => PhaseRecord::new(url.as_str()),
        };

        if record.is_completed() {
            if !options.allow_rerun {
                return Err(SiteflowError::RecordCompleted {
                    id: record.id.clone(),
                });
            }
            record.status = PhaseStatus::InProgress;
        }

        info!(phase = %phase, record = %record.id, url = %url, "running phase");

        match phase {
            PhaseNumber::Collection => self.run_phase1(record, url, options, progress).await,
            PhaseNumber::Scoring => self.run_phase2(record, url, options, progress).await,
            PhaseNumber::Synthesis => self.run_phase3(record, url, options, progress).await,
        }
    }

    /// Run all three phases in sequence on one record
    pub async fn run_full(
        &self,
        url: &Url,
        options: &PhaseOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<PhaseOutcome, SiteflowError> {
        let first = self
            .run(PhaseNumber::Collection, url, options, progress)
            .await?;

        let mut chained = options.clone();
        chained.record_id = Some(first.record.id.clone());

        self.run(PhaseNumber::Scoring, url, &chained, progress).await?;
        self.run(PhaseNumber::Synthesis, url, &chained, progress).await
    }

    // ── Phase 1: collection ──────────────────────────────────────────────

    async fn run_phase1(
        &self,
        mut record: PhaseRecord,
        url: &Url,
        options: &PhaseOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<PhaseOutcome, SiteflowError> {
        let candidates = discover(url, &options.discovery, self.extractor.as_ref()).await?;
        let steps = apply_timeouts(collection_steps(url, &candidates), &options.timeouts);

        let run = self
            .executor
            .execute(&steps, url.as_str(), &TemplateContext::new(), progress)
            .await?;

        let snapshots = collect_snapshots(&run);
        record.merge_phase1(Phase1Output {
            candidates,
            snapshots,
            basic: false,
        });

        record.bump();
        self.store.upsert(&record).await?;

        Ok(PhaseOutcome {
            record,
            advisories: Vec::new(),
            run,
        })
    }

    /// Minimal phase-1 equivalent: seed-only extraction, marked basic
    async fn backfill_phase1(
        &self,
        url: &Url,
        timeouts: &TimeoutConfig,
        progress: Option<&ProgressSender>,
    ) -> Result<(Phase1Output, PipelineRun), SiteflowError> {
        let steps = apply_timeouts(vec![seed_extraction_step(url)], timeouts);
        let run = self
            .executor
            .execute(&steps, url.as_str(), &TemplateContext::new(), progress)
            .await?;

        let output = Phase1Output {
            candidates: Vec::new(),
            snapshots: collect_snapshots(&run),
            basic: true,
        };
        Ok((output, run))
    }

    /// Phase-1 output for a later phase, backfilling when absent
    async fn ensure_phase1(
        &self,
        record: &mut PhaseRecord,
        url: &Url,
        timeouts: &TimeoutConfig,
        advisories: &mut Vec<String>,
        progress: Option<&ProgressSender>,
    ) -> Result<Phase1Output, SiteflowError> {
        if let Some(output) = &record.phase1 {
            if output.basic {
                advisories.push(
                    "Phase 1 output is a basic seed-page extraction; \
                     run phase 1 for full multi-page coverage."
                        .to_string(),
                );
            }
            return Ok(output.clone());
        }

        advisories.push(
            "Phase 1 was skipped: using basic extraction of the seed page only.".to_string(),
        );
        advisories.push(
            "Running phase 1 first would add prioritized subpages (pricing, products, blog) \
             to the analysis."
                .to_string(),
        );

        let (output, _) = self.backfill_phase1(url, timeouts, progress).await?;
        // Stored for later phases, but not counted as a completed phase 1
        record.phase1 = Some(output.clone());
        Ok(output)
    }

    // ── Phase 2: framework scoring ───────────────────────────────────────

    async fn run_phase2(
        &self,
        mut record: PhaseRecord,
        url: &Url,
        options: &PhaseOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<PhaseOutcome, SiteflowError> {
        let mut advisories = Vec::new();
        let phase1 = self
            .ensure_phase1(&mut record, url, &options.timeouts, &mut advisories, progress)
            .await?;

        let (steps, ctx) = scoring_steps(url, &phase1);
        let steps = apply_timeouts(steps, &options.timeouts);

        // All four scoring steps are critical in isolation: a partially
        // scored framework report cannot distinguish "not scored" from
        // "scored zero", so completeness wins over availability.
        let run = self
            .executor
            .execute(&steps, url.as_str(), &ctx, progress)
            .await
            .map_err(|e| SiteflowError::PhaseFailed {
                phase: 2,
                reason: e.to_string(),
            })?;

        let output = parse_framework_scores(&run)?;
        record.merge_phase2(output);

        record.bump();
        self.store.upsert(&record).await?;

        Ok(PhaseOutcome {
            record,
            advisories,
            run,
        })
    }

    /// Phase-2 output for phase 3, backfilling with one condensed scoring
    /// pass when absent
    async fn ensure_phase2(
        &self,
        record: &mut PhaseRecord,
        url: &Url,
        phase1: &Phase1Output,
        timeouts: &TimeoutConfig,
        advisories: &mut Vec<String>,
        progress: Option<&ProgressSender>,
    ) -> Result<Phase2Output, SiteflowError> {
        if let Some(output) = &record.phase2 {
            return Ok(output.clone());
        }

        advisories.push(
            "Phase 2 was skipped: framework scores were derived from a single condensed \
             scoring pass instead of four dedicated analyses."
                .to_string(),
        );

        let (step, ctx) = condensed_scoring_step(url, phase1);
        let steps = apply_timeouts(vec![step], timeouts);
        let run = self
            .executor
            .execute(&steps, url.as_str(), &ctx, progress)
            .await
            .map_err(|e| SiteflowError::PhaseFailed {
                phase: 3,
                reason: e.to_string(),
            })?;

        let result = run
            .result("framework_scores_condensed")
            .flatten()
            .cloned()
            .ok_or_else(|| SiteflowError::PhaseFailed {
                phase: 3,
                reason: "condensed scoring produced no result".to_string(),
            })?;

        let output: Phase2Output =
            serde_json::from_value(result).map_err(|e| SiteflowError::PhaseFailed {
                phase: 3,
                reason: format!("condensed scoring output malformed: {e}"),
            })?;

        record.phase2 = Some(output.clone());
        Ok(output)
    }

    // ── Phase 3: strategic synthesis ─────────────────────────────────────

    async fn run_phase3(
        &self,
        mut record: PhaseRecord,
        url: &Url,
        options: &PhaseOptions,
        progress: Option<&ProgressSender>,
    ) -> Result<PhaseOutcome, SiteflowError> {
        let mut advisories = Vec::new();
        let missing_both = record.phase1.is_none() && record.phase2.is_none();

        let phase1 = self
            .ensure_phase1(&mut record, url, &options.timeouts, &mut advisories, progress)
            .await?;
        let phase2 = self
            .ensure_phase2(
                &mut record,
                url,
                &phase1,
                &options.timeouts,
                &mut advisories,
                progress,
            )
            .await?;

        if missing_both {
            advisories.push(
                "Both collection and scoring phases were skipped; the compounded accuracy \
                 loss substantially reduces the reliability of this report."
                    .to_string(),
            );
        }

        let (step, ctx) = synthesis_step(url, &phase1, &phase2)?;
        let steps = apply_timeouts(vec![step], &options.timeouts);
        let run = self
            .executor
            .execute(&steps, url.as_str(), &ctx, progress)
            .await
            .map_err(|e| SiteflowError::PhaseFailed {
                phase: 3,
                reason: e.to_string(),
            })?;

        let synthesis = run
            .result("synthesis")
            .flatten()
            .cloned()
            .unwrap_or(Value::Null);

        // The model's own aggregate wins when present; otherwise fall back
        // to the framework mean.
        let score = synthesis
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or_else(|| phase2.mean_score());

        record.merge_phase3(
            Phase3Output {
                synthesis,
                summary: run.summary.clone(),
            },
            score,
        );

        record.bump();
        self.store.upsert(&record).await?;

        Ok(PhaseOutcome {
            record,
            advisories,
            run,
        })
    }
}

// ── Step-set builders ───────────────────────────────────────────────────

/// Apply configured timeout overrides by step class
fn apply_timeouts(steps: Vec<Step>, timeouts: &TimeoutConfig) -> Vec<Step> {
    steps
        .into_iter()
        .map(|step| {
            let secs = match step.kind {
                StepKind::Extraction { .. } => timeouts.extraction_secs,
                StepKind::Generation => timeouts.generation_secs,
            };
            match secs {
                Some(secs) => step.with_timeout(Duration::from_secs(secs)),
                None => step,
            }
        })
        .collect()
}

fn seed_extraction_step(url: &Url) -> Step {
    // Seed extraction is the step nothing downstream is meaningful without
    Step::extraction("extract_seed", url.clone()).critical()
}

/// Extraction steps for the seed plus each candidate page
fn collection_steps(url: &Url, candidates: &[CandidatePage]) -> Vec<Step> {
    let mut steps = vec![seed_extraction_step(url)];
    let mut taken: HashSet<String> = steps.iter().map(|s| s.id.clone()).collect();

    for candidate in candidates {
        let mut id = format!("extract_{}", slugify(candidate.url.path()));
        let mut n = 2;
        while !taken.insert(id.clone()) {
            id = format!("extract_{}_{n}", slugify(candidate.url.path()));
            n += 1;
        }
        steps.push(Step::extraction(id, candidate.url.clone()));
    }

    steps
}

/// The four framework scoring steps, all critical, plus their context
fn scoring_steps(url: &Url, phase1: &Phase1Output) -> (Vec<Step>, TemplateContext) {
    let mut ctx = TemplateContext::new();
    ctx.insert("site_url", url.as_str());
    ctx.insert_required("site_content", phase1.combined_text());

    let steps = FRAMEWORKS
        .iter()
        .map(|(id, title, focus)| {
            Step::generation(
                *id,
                format!(
                    "You are a website analyst. Score the site {{{{site_url}}}} \
                     on {title} (framework: {id}): {focus}.\n\
                     Respond with JSON only: \
                     {{\"score\": <0-100>, \"findings\": [...], \"recommendations\": [...]}}\n\n\
                     Site content:\n{{{{site_content}}}}"
                ),
            )
            .with_timeout(Duration::from_secs(25))
            .with_expected_duration(Duration::from_secs(15))
            .critical()
        })
        .collect();

    (steps, ctx)
}

/// Single condensed scoring pass used when phase 3 must backfill phase 2
fn condensed_scoring_step(url: &Url, phase1: &Phase1Output) -> (Step, TemplateContext) {
    let mut ctx = TemplateContext::new();
    ctx.insert("site_url", url.as_str());
    ctx.insert_required("site_content", phase1.combined_text());

    let framework_list = FRAMEWORKS
        .iter()
        .map(|(id, title, focus)| format!("- {id}: {title} ({focus})"))
        .collect::<Vec<_>>()
        .join("\n");

    let step = Step::generation(
        "framework_scores_condensed",
        format!(
            "You are a website analyst. Score the site {{{{site_url}}}} on each framework \
             below in one pass.\n{framework_list}\n\
             Respond with JSON only: {{\"frameworks\": {{\"<framework id>\": \
             {{\"score\": <0-100>, \"findings\": [...], \"recommendations\": [...]}}}}}}\n\n\
             Site content:\n{{{{site_content}}}}"
        ),
    )
    .with_timeout(Duration::from_secs(35))
    .with_expected_duration(Duration::from_secs(20))
    .critical();

    (step, ctx)
}

/// The synthesis step over collection and scoring output
fn synthesis_step(
    url: &Url,
    phase1: &Phase1Output,
    phase2: &Phase2Output,
) -> Result<(Step, TemplateContext), SiteflowError> {
    let mut ctx = TemplateContext::new();
    ctx.insert("site_url", url.as_str());
    ctx.insert_required("site_content", phase1.combined_text());
    ctx.insert_required(
        "framework_scores",
        serde_json::to_string(&phase2.frameworks)?,
    );

    let step = Step::generation(
        "synthesis",
        "You are a strategy consultant. Synthesize a strategic report for \
         {{site_url}} from the framework scores and site content.\n\
         Framework scores: {{framework_scores}}\n\
         Respond with JSON only: {\"score\": <0-100>, \"executiveSummary\": \"...\", \
         \"keyFindings\": [...], \"recommendations\": [...]}\n\n\
         Site content:\n{{site_content}}",
    )
    .with_timeout(Duration::from_secs(35))
    .with_expected_duration(Duration::from_secs(25))
    .critical();

    Ok((step, ctx))
}

/// Step plan for graph rendering. Collection candidates are only known at
/// runtime, so the collection plan shows the seed extraction alone. The
/// whole-pipeline view adds the data-flow edges between phases.
pub fn planned_steps(
    phase: Option<PhaseNumber>,
    url: &Url,
) -> Result<Vec<Step>, SiteflowError> {
    let placeholder = Phase1Output {
        candidates: Vec::new(),
        snapshots: Vec::new(),
        basic: true,
    };
    let empty_scores = Phase2Output {
        frameworks: Default::default(),
    };

    match phase {
        Some(PhaseNumber::Collection) => Ok(vec![seed_extraction_step(url)]),
        Some(PhaseNumber::Scoring) => Ok(scoring_steps(url, &placeholder).0),
        Some(PhaseNumber::Synthesis) => {
            Ok(vec![synthesis_step(url, &placeholder, &empty_scores)?.0])
        }
        None => {
            let mut steps = vec![seed_extraction_step(url)];
            for step in scoring_steps(url, &placeholder).0 {
                steps.push(step.depends_on(["extract_seed"]));
            }
            let framework_ids: Vec<&str> = FRAMEWORKS.iter().map(|(id, _, _)| *id).collect();
            let (synthesis, _) = synthesis_step(url, &placeholder, &empty_scores)?;
            steps.push(synthesis.depends_on(framework_ids));
            Ok(steps)
        }
    }
}

// ── Result decoding ─────────────────────────────────────────────────────

/// Decode completed extraction results back into snapshots, in step order
fn collect_snapshots(run: &PipelineRun) -> Vec<PageSnapshot> {
    run.steps
        .iter()
        .filter_map(|s| s.result.clone())
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Decode the four framework results into phase-2 output
fn parse_framework_scores(run: &PipelineRun) -> Result<Phase2Output, SiteflowError> {
    let mut frameworks = std::collections::BTreeMap::new();

    for (id, _, _) in FRAMEWORKS {
        let result = run.result(id).flatten().cloned().ok_or_else(|| {
            SiteflowError::PhaseFailed {
                phase: 2,
                reason: format!("framework '{id}' produced no result"),
            }
        })?;

        let score: FrameworkScore =
            serde_json::from_value(result).map_err(|e| SiteflowError::PhaseFailed {
                phase: 2,
                reason: format!("framework '{id}' output malformed: {e}"),
            })?;

        frameworks.insert(id.to_string(), score);
    }

    Ok(Phase2Output { frameworks })
}

fn slugify(path: &str) -> String {
    let slug: String = path
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Generator scripted by prompt substring; first matching needle wins
    #[derive(Default)]
    struct MockModel {
        responses: Vec<(String, String)>,
        fail_needle: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockModel {
        fn scoring_ok() -> Self {
            let mut responses = Vec::new();
            for (id, _, _) in FRAMEWORKS {
                responses.push((
                    format!("framework: {id}"),
                    format!(
                        r#"{{"score": 70.0, "findings": ["{id} finding"],
                            "recommendations": ["improve {id}"]}}"#
                    ),
                ));
            }
            responses.push((
                "one pass".to_string(),
                serde_json::json!({
                    "frameworks": {
                        "content_quality": {"score": 60.0},
                        "seo_fundamentals": {"score": 60.0},
                        "messaging_clarity": {"score": 60.0},
                        "conversion_readiness": {"score": 60.0},
                    }
                })
                .to_string(),
            ));
            responses.push((
                "strategy consultant".to_string(),
                r#"{"score": 68.0, "executiveSummary": "solid",
                    "keyFindings": ["finding"], "recommendations": ["rec"]}"#
                    .to_string(),
            ));
            Self {
                responses,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TextGenerator for MockModel {
        async fn generate(&self, prompt: &str) -> Result<String, SiteflowError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            if let Some(needle) = &self.fail_needle {
                if prompt.contains(needle) {
                    return Err(SiteflowError::GenerationFailed {
                        message: "injected fault".into(),
                    });
                }
            }
            for (needle, response) in &self.responses {
                if prompt.contains(needle) {
                    return Ok(response.clone());
                }
            }
            Ok("{}".to_string())
        }
    }

    struct FakeSite {
        pages: HashMap<String, String>,
    }

    impl FakeSite {
        fn with_candidates() -> Self {
            let mut pages = HashMap::new();
            pages.insert(
                "/".to_string(),
                r#"<title>Seed</title><a href="/about">a</a><a href="/pricing">p</a>
                   <p>seed body text</p>"#
                    .to_string(),
            );
            pages.insert("/about".to_string(), "<title>About</title>".to_string());
            pages.insert("/pricing".to_string(), "<title>Pricing</title>".to_string());
            Self { pages }
        }
    }

    #[async_trait]
    impl PageExtractor for FakeSite {
        async fn fetch_html(&self, url: &Url) -> Result<String, SiteflowError> {
            self.pages.get(url.path()).cloned().ok_or_else(|| {
                SiteflowError::ExtractionFailed {
                    url: url.to_string(),
                    message: "not found".into(),
                }
            })
        }

        async fn extract(&self, url: &Url) -> Result<PageSnapshot, SiteflowError> {
            let html = self.fetch_html(url).await?;
            Ok(crate::clients::extractor::snapshot_from_html(url, &html))
        }
    }

    fn runner_with(model: MockModel) -> (PhaseRunner, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let runner = PhaseRunner::new(
            Arc::new(model),
            Arc::new(FakeSite::with_candidates()),
            store.clone(),
        );
        (runner, store)
    }

    fn url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[tokio::test]
    async fn test_phase1_persists_snapshots() {
        let (runner, store) = runner_with(MockModel::scoring_ok());

        let outcome = runner
            .run(PhaseNumber::Collection, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();

        assert!(outcome.advisories.is_empty());
        let record = store.get(&outcome.record.id).await.unwrap().unwrap();
        assert_eq!(
            record.completed_phases.iter().copied().collect::<Vec<_>>(),
            vec![1]
        );
        let phase1 = record.phase1.unwrap();
        assert!(!phase1.basic);
        // seed + /about + /pricing
        assert_eq!(phase1.snapshots.len(), 3);
        assert_eq!(phase1.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_phase2_with_prior_phase1_has_no_advisory() {
        let (runner, _) = runner_with(MockModel::scoring_ok());

        let first = runner
            .run(PhaseNumber::Collection, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();

        let options = PhaseOptions {
            record_id: Some(first.record.id.clone()),
            ..Default::default()
        };
        let outcome = runner
            .run(PhaseNumber::Scoring, &url(), &options, None)
            .await
            .unwrap();

        assert!(outcome.advisories.is_empty());
        let phase2 = outcome.record.phase2.unwrap();
        assert_eq!(phase2.frameworks.len(), 4);
        assert!((phase2.mean_score() - 70.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_phase2_standalone_emits_advisories() {
        let (runner, _) = runner_with(MockModel::scoring_ok());

        let outcome = runner
            .run(PhaseNumber::Scoring, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();

        assert!(!outcome.advisories.is_empty());
        let phase1 = outcome.record.phase1.unwrap();
        assert!(phase1.basic);
        // Backfill does not count as a completed phase 1
        assert!(!outcome.record.completed_phases.contains(&1));
        assert!(outcome.record.completed_phases.contains(&2));
    }

    #[tokio::test]
    async fn test_phase2_framework_failure_fails_phase() {
        let (runner, store) = runner_with(MockModel {
            fail_needle: Some("framework: seo_fundamentals".into()),
            ..MockModel::scoring_ok()
        });

        let first = runner
            .run(PhaseNumber::Collection, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();

        let options = PhaseOptions {
            record_id: Some(first.record.id.clone()),
            ..Default::default()
        };
        let err = runner
            .run(PhaseNumber::Scoring, &url(), &options, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SiteflowError::PhaseFailed { phase: 2, .. }));

        // Nothing partial was written back
        let record = store.get(&first.record.id).await.unwrap().unwrap();
        assert!(record.phase2.is_none());
        assert_eq!(record.version, first.record.version);
    }

    #[tokio::test]
    async fn test_three_phase_merge_completes_record() {
        let (runner, store) = runner_with(MockModel::scoring_ok());

        let first = runner
            .run(PhaseNumber::Collection, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();
        let options = PhaseOptions {
            record_id: Some(first.record.id.clone()),
            ..Default::default()
        };
        runner
            .run(PhaseNumber::Scoring, &url(), &options, None)
            .await
            .unwrap();
        let last = runner
            .run(PhaseNumber::Synthesis, &url(), &options, None)
            .await
            .unwrap();

        assert!(last.advisories.is_empty());

        let record = store.get(&first.record.id).await.unwrap().unwrap();
        assert!(record.is_completed());
        assert_eq!(
            record.completed_phases.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(record.phase1.is_some());
        assert!(record.phase2.is_some());
        assert!(record.phase3.is_some());
        assert_eq!(record.score, Some(68.0));
    }

    #[tokio::test]
    async fn test_phase3_standalone_cascades_advisories() {
        let (runner, _) = runner_with(MockModel::scoring_ok());

        let outcome = runner
            .run(PhaseNumber::Synthesis, &url(), &PhaseOptions::default(), None)
            .await
            .unwrap();

        // Skipped phase 1, skipped phase 2, and the compounded-loss warning
        assert!(outcome.advisories.len() >= 3);
        assert!(outcome
            .advisories
            .iter()
            .any(|a| a.contains("compounded")));
        assert!(outcome.record.is_completed());
    }

    #[tokio::test]
    async fn test_completed_record_rejects_rerun() {
        let (runner, _) = runner_with(MockModel::scoring_ok());

        let outcome = runner
            .run_full(&url(), &PhaseOptions::default(), None)
            .await
            .unwrap();
        assert!(outcome.record.is_completed());

        let options = PhaseOptions {
            record_id: Some(outcome.record.id.clone()),
            ..Default::default()
        };
        let err = runner
            .run(PhaseNumber::Scoring, &url(), &options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteflowError::RecordCompleted { .. }));

        // --force reopens the record
        let forced = PhaseOptions {
            allow_rerun: true,
            ..options
        };
        runner
            .run(PhaseNumber::Scoring, &url(), &forced, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_record_id() {
        let (runner, _) = runner_with(MockModel::scoring_ok());

        let options = PhaseOptions {
            record_id: Some("missing".into()),
            ..Default::default()
        };
        let err = runner
            .run(PhaseNumber::Collection, &url(), &options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteflowError::RecordNotFound { .. }));
    }

    #[test]
    fn test_phase_number_parsing() {
        assert_eq!(PhaseNumber::try_from(1).unwrap(), PhaseNumber::Collection);
        assert_eq!(PhaseNumber::try_from(3).unwrap(), PhaseNumber::Synthesis);
        assert!(matches!(
            PhaseNumber::try_from(4),
            Err(SiteflowError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_timeout_overrides_by_step_class() {
        let steps = vec![
            Step::extraction("e", url()),
            Step::generation("g", "prompt"),
        ];
        let timeouts = TimeoutConfig {
            extraction_secs: Some(3),
            generation_secs: None,
        };

        let steps = apply_timeouts(steps, &timeouts);
        assert_eq!(steps[0].timeout, Duration::from_secs(3));
        assert_eq!(steps[1].timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_collection_step_ids_unique() {
        let candidates: Vec<CandidatePage> = ["/a b", "/a_b"]
            .iter()
            .map(|p| CandidatePage {
                url: Url::parse(&format!("https://example.com{p}")).unwrap(),
                page_type: crate::discover::PageType::Subpage,
                priority: 1,
            })
            .collect();

        let steps = collection_steps(&url(), &candidates);
        let ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), steps.len());
    }
}
