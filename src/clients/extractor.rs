// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! HTTP-backed page extractor
//!
//! Fetches a page over HTTP and derives a structured snapshot with regex
//! passes over the markup. Good enough for the fields the scoring prompts
//! consume; not a general HTML parser.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

use super::{PageExtractor, PageSnapshot};
use crate::errors::SiteflowError;

const USER_AGENT: &str = concat!("siteflow/", env!("CARGO_PKG_VERSION"));

struct HtmlPatterns {
    title: Regex,
    meta_description: Regex,
    h1: Regex,
    h2: Regex,
    anchor: Regex,
    image: Regex,
    tag: Regex,
    script_style: Regex,
}

fn patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"),
        meta_description: Regex::new(
            r#"(?is)<meta[^>]+name=["']description["'][^>]+content=["']([^"']*)["']"#,
        )
        .expect("valid regex"),
        h1: Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid regex"),
        h2: Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").expect("valid regex"),
        anchor: Regex::new(r#"(?i)<a\s[^>]*href=["']([^"'#]+)["']"#).expect("valid regex"),
        image: Regex::new(r"(?i)<img[\s>]").expect("valid regex"),
        tag: Regex::new(r"(?s)<[^>]+>").expect("valid regex"),
        script_style: Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
            .expect("valid regex"),
    })
}

/// Page extractor backed by reqwest
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl HttpExtractor {
    pub fn new() -> Result<Self, SiteflowError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageExtractor for HttpExtractor {
    async fn fetch_html(&self, url: &Url) -> Result<String, SiteflowError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            SiteflowError::ExtractionFailed {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(SiteflowError::ExtractionFailed {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| SiteflowError::ExtractionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn extract(&self, url: &Url) -> Result<PageSnapshot, SiteflowError> {
        let html = self.fetch_html(url).await?;
        Ok(snapshot_from_html(url, &html))
    }
}

/// Derive a snapshot from raw HTML
pub fn snapshot_from_html(url: &Url, html: &str) -> PageSnapshot {
    let p = patterns();

    let title = p
        .title
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default();

    let meta_description = p
        .meta_description
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default();

    let h1_headings: Vec<String> = p
        .h1
        .captures_iter(html)
        .map(|c| clean_text(&c[1]))
        .filter(|h| !h.is_empty())
        .collect();

    let h2_headings: Vec<String> = p
        .h2
        .captures_iter(html)
        .map(|c| clean_text(&c[1]))
        .filter(|h| !h.is_empty())
        .collect();

    let link_count = p.anchor.captures_iter(html).count();
    let image_count = p.image.find_iter(html).count();

    let without_scripts = p.script_style.replace_all(html, " ");
    let cleaned_text = clean_text(&without_scripts);
    let word_count = cleaned_text.split_whitespace().count();
    let keywords = top_keywords(&cleaned_text, 10);

    PageSnapshot {
        url: url.to_string(),
        title,
        meta_description,
        h1_headings,
        h2_headings,
        word_count,
        keywords,
        link_count,
        image_count,
        cleaned_text,
    }
}

/// Extract all anchor hrefs from raw HTML
pub fn extract_hrefs(html: &str) -> Vec<String> {
    patterns()
        .anchor
        .captures_iter(html)
        .map(|c| c[1].trim().to_string())
        .collect()
}

fn clean_text(fragment: &str) -> String {
    let stripped = patterns().tag.replace_all(fragment, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Most frequent words of 4+ characters, a rough keyword proxy
fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.len() >= 4 {
            *counts.entry(word).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // Count desc, then alphabetical for a stable order
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}
