// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Discover command - list prioritized candidate subpages

use colored::Colorize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::clients::HttpExtractor;
use crate::discover::discover;
use crate::errors::SiteflowError;

pub async fn run(
    url: String,
    max_pages: Option<usize>,
    max_depth: Option<usize>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
    _verbose: bool,
) -> Result<(), SiteflowError> {
    let url = SiteflowError::parse_url(&url)?;

    let config = super::load_config(config_path.as_deref())?;
    let mut options = config.discovery;
    if let Some(max_pages) = max_pages {
        options.max_pages = max_pages;
    }
    if let Some(max_depth) = max_depth {
        options.max_depth = max_depth;
    }

    let extractor = HttpExtractor::new()?;
    let candidates = discover(&url, &options, &extractor).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        OutputFormat::Text => {
            if candidates.is_empty() {
                println!("No candidate subpages found for {}", url.as_str().cyan());
                return Ok(());
            }

            println!(
                "{} candidate pages for {}",
                candidates.len(),
                url.as_str().cyan()
            );
            for candidate in &candidates {
                println!(
                    "  {:>3}  {:<10} {}",
                    candidate.priority,
                    candidate.page_type.to_string().dimmed(),
                    candidate.url
                );
            }
        }
    }

    Ok(())
}
