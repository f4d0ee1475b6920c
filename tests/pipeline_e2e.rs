// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! End-to-end pipeline tests
//!
//! Drive discovery and the step executor together against canned HTML and
//! a scripted generator, covering the analyze-a-site flow and its
//! timeout/short-circuit behavior.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use siteflow::clients::extractor::snapshot_from_html;
use siteflow::clients::{PageExtractor, PageSnapshot, TextGenerator};
use siteflow::discover::{discover, DiscoveryOptions, PageType};
use siteflow::errors::SiteflowError;
use siteflow::pipeline::{Step, StepExecutor, StepStatus, TemplateContext};

const HOME_HTML: &str = r#"
<html><head><title>Acme Widgets</title></head><body>
<a href="/about">About</a>
<a href="/pricing">Pricing</a>
<p>Acme builds industrial widgets for demanding factories worldwide.</p>
</body></html>"#;

const ABOUT_HTML: &str = r#"
<html><head><title>About Acme</title></head><body>
<h1>About our team</h1>
<p>Founded by veteran machinists in 2009.</p>
</body></html>"#;

const PRICING_HTML: &str = r#"
<html><head><title>Acme Pricing</title></head><body>
<h1>Simple pricing</h1>
<p>Starter plan twelve dollars monthly.</p>
</body></html>"#;

/// Extractor over canned HTML, with a configurable stall on one path
struct CannedSite {
    pages: HashMap<&'static str, &'static str>,
    stall_path: Option<&'static str>,
}

impl CannedSite {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert("/", HOME_HTML);
        pages.insert("/about", ABOUT_HTML);
        pages.insert("/pricing", PRICING_HTML);
        Self {
            pages,
            stall_path: None,
        }
    }

    fn stalling_on(path: &'static str) -> Self {
        Self {
            stall_path: Some(path),
            ..Self::new()
        }
    }
}

#[async_trait]
impl PageExtractor for CannedSite {
    async fn fetch_html(&self, url: &Url) -> Result<String, SiteflowError> {
        self.pages
            .get(url.path())
            .map(|html| html.to_string())
            .ok_or_else(|| SiteflowError::ExtractionFailed {
                url: url.to_string(),
                message: "not found".to_string(),
            })
    }

    async fn extract(&self, url: &Url) -> Result<PageSnapshot, SiteflowError> {
        if self.stall_path == Some(url.path()) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let html = self.fetch_html(url).await?;
        Ok(snapshot_from_html(url, &html))
    }
}

/// Generator that records every prompt it receives
#[derive(Default)]
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for RecordingModel {
    async fn generate(&self, prompt: &str) -> Result<String, SiteflowError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(r#"{"score": 72.0, "keyFindings": ["strong pricing page"],
              "recommendations": ["add testimonials"]}"#
            .to_string())
    }
}

fn seed() -> Url {
    Url::parse("https://acme.test/").unwrap()
}

fn analysis_steps(site: &Url, candidates: &[(String, Url)]) -> Vec<Step> {
    let mut steps = vec![Step::extraction("extract_home", site.clone()).critical()];
    let mut dep_ids = vec!["extract_home".to_string()];

    for (id, url) in candidates {
        steps.push(Step::extraction(id.clone(), url.clone()));
        dep_ids.push(id.clone());
    }

    let refs = dep_ids
        .iter()
        .map(|id| format!("{{{{{id}}}}}"))
        .collect::<Vec<_>>()
        .join("\n");
    steps.push(
        Step::generation("score_site", format!("Score this site:\n{refs}")).depends_on(dep_ids),
    );
    steps
}

#[tokio::test]
async fn test_discovery_feeds_scoring_prompt() {
    let site = Arc::new(CannedSite::new());
    let candidates = discover(&seed(), &DiscoveryOptions::default(), site.as_ref())
        .await
        .unwrap();

    // /pricing outranks /about
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].url.path(), "/pricing");
    assert_eq!(candidates[0].page_type, PageType::Pricing);
    assert_eq!(candidates[0].priority, 4);
    assert_eq!(candidates[1].url.path(), "/about");
    assert_eq!(candidates[1].priority, 2);

    let named: Vec<(String, Url)> = candidates
        .iter()
        .map(|c| {
            let name = c.url.path().trim_matches('/').to_string();
            (format!("extract_{name}"), c.url.clone())
        })
        .collect();
    let steps = analysis_steps(&seed(), &named);

    let model = Arc::new(RecordingModel::default());
    let executor = StepExecutor::new(model.clone(), site);
    let run = executor
        .execute(&steps, seed().as_str(), &TemplateContext::new(), None)
        .await
        .unwrap();

    assert_eq!(run.completed_count(), 4);
    assert!(run.failed_steps().is_empty());

    // The scoring prompt embeds all three extracted pages
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("industrial widgets"));
    assert!(prompt.contains("About our team"));
    assert!(prompt.contains("Simple pricing"));

    assert!((run.summary.overall_score - 72.0).abs() < f64::EPSILON);
    assert_eq!(run.summary.key_findings, vec!["strong pricing page"]);
}

#[tokio::test]
async fn test_timed_out_extraction_short_circuits_scoring() {
    let site = Arc::new(CannedSite::stalling_on("/pricing"));

    let pricing = Url::parse("https://acme.test/pricing").unwrap();
    let about = Url::parse("https://acme.test/about").unwrap();
    let mut steps = vec![
        Step::extraction("extract_home", seed()).critical(),
        Step::extraction("extract_about", about),
        Step::extraction("extract_pricing", pricing).with_timeout(Duration::from_millis(50)),
    ];
    steps.push(
        Step::generation(
            "score_site",
            "Score:\n{{extract_home}}\n{{extract_about}}\n{{extract_pricing}}",
        )
        .depends_on(["extract_home", "extract_about", "extract_pricing"]),
    );

    let model = Arc::new(RecordingModel::default());
    let executor = StepExecutor::new(model.clone(), site);
    let run = executor
        .execute(&steps, seed().as_str(), &TemplateContext::new(), None)
        .await
        .unwrap();

    // The stalled step failed alone; its dependent never ran externally
    assert_eq!(run.failed_steps(), vec!["extract_pricing", "score_site"]);
    assert_eq!(run.completed_count(), 2);
    assert!(model.prompts.lock().unwrap().is_empty());

    let pricing_step = run
        .steps
        .iter()
        .find(|s| s.step_id == "extract_pricing")
        .unwrap();
    assert_eq!(pricing_step.status, StepStatus::Failed);
    assert!(pricing_step.result.is_none());
    assert!(pricing_step
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("timed out"));

    let scoring = run.steps.iter().find(|s| s.step_id == "score_site").unwrap();
    assert!(scoring
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("extract_pricing"));

    assert_eq!(run.summary.failed_steps.len(), 2);
}
