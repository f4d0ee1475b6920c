// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! External collaborators
//!
//! The pipeline treats content extraction and text generation as black boxes
//! behind these traits. HTTP-backed implementations live in this module;
//! tests substitute their own.

pub mod extractor;
mod generator;

pub use extractor::HttpExtractor;
pub use generator::{GeneratorConfig, HttpGenerator};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::SiteflowError;

/// Structured snapshot of a single fetched page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub h1_headings: Vec<String>,
    pub h2_headings: Vec<String>,
    pub word_count: usize,
    pub keywords: Vec<String>,
    pub link_count: usize,
    pub image_count: usize,
    /// Body text with markup stripped
    pub cleaned_text: String,
}

impl PageSnapshot {
    /// Serialize for use as a step result
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Fetches a page and extracts its content
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Fetch the raw HTML of a page
    async fn fetch_html(&self, url: &Url) -> Result<String, SiteflowError>;

    /// Fetch a page and extract a structured snapshot
    async fn extract(&self, url: &Url) -> Result<PageSnapshot, SiteflowError>;
}

/// Invokes the generative-text model with a rendered prompt.
///
/// The collaborator gives no format guarantee beyond best-effort compliance
/// with the prompt's requested schema; parsing is the pipeline's job.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SiteflowError>;
}
