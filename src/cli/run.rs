// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Run command - full three-phase analysis

use colored::Colorize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::errors::SiteflowError;
use crate::phase::{PhaseOptions, PhaseOutcome, FRAMEWORKS};
use crate::pipeline::progress_channel;
use crate::utils::spawn_renderer;

/// Run all three phases against a fresh record
pub async fn run(
    url: String,
    format: OutputFormat,
    max_pages: Option<usize>,
    no_progress: bool,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<(), SiteflowError> {
    let url = SiteflowError::parse_url(&url)?;

    let config = super::load_config(config_path.as_deref())?;
    let mut options = PhaseOptions {
        discovery: config.discovery.clone(),
        timeouts: config.timeouts.clone(),
        ..Default::default()
    };
    if let Some(max_pages) = max_pages {
        options.discovery.max_pages = max_pages;
    }

    let runner = super::build_runner(&config)?;

    let outcome = if no_progress || format == OutputFormat::Json {
        runner.run_full(&url, &options, None).await?
    } else {
        let (tx, rx) = progress_channel();
        let renderer = spawn_renderer(rx);
        let result = runner.run_full(&url, &options, Some(&tx)).await;
        drop(tx);
        let _ = renderer.await;
        result?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
        }
        OutputFormat::Text => print_report(&outcome, verbose),
    }

    Ok(())
}

/// Render a completed analysis to the terminal
pub(crate) fn print_report(outcome: &PhaseOutcome, verbose: bool) {
    let record = &outcome.record;

    println!();
    println!("{} {}", "Analysis report for".bold(), record.url.cyan());

    if let Some(score) = record.score {
        println!("  {} {:.0}/100", "Overall score:".bold(), score);
    }

    if let Some(phase2) = &record.phase2 {
        println!();
        println!("{}", "Framework scores".bold());
        for (id, title, _) in FRAMEWORKS {
            if let Some(fs) = phase2.frameworks.get(*id) {
                println!("  {:<24} {:>5.1}", title, fs.score);
            }
        }
    }

    if let Some(phase3) = &record.phase3 {
        let summary = &phase3.summary;
        if !summary.key_findings.is_empty() {
            println!();
            println!("{}", "Key findings".bold());
            for finding in &summary.key_findings {
                println!("  - {finding}");
            }
        }
        if !summary.priority_recommendations.is_empty() {
            println!();
            println!("{}", "Recommendations".bold());
            for rec in &summary.priority_recommendations {
                println!("  - {rec}");
            }
        }
        if !summary.failed_steps.is_empty() {
            println!();
            println!("{}", "Failed steps".red().bold());
            for step in &summary.failed_steps {
                println!("  {} {}", "✗".red(), step);
            }
        }
    }

    if !outcome.advisories.is_empty() {
        println!();
        for advisory in &outcome.advisories {
            println!("  {} {}", "⚠".yellow(), advisory.yellow());
        }
    }

    println!();
    println!(
        "  {} {}",
        "Record:".dimmed(),
        record.id.as_str().dimmed()
    );
    if verbose {
        println!(
            "  {}",
            format!(
                "Completed phases: {:?} (version {})",
                record.completed_phases, record.version
            )
            .dimmed()
        );
    }
}
