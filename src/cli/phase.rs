// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Phase command - run one analysis phase, optionally resuming a record

use colored::Colorize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::errors::SiteflowError;
use crate::phase::{PhaseNumber, PhaseOptions};
use crate::pipeline::progress_channel;
use crate::utils::spawn_renderer;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    phase: u8,
    url: String,
    record: Option<String>,
    force: bool,
    format: OutputFormat,
    no_progress: bool,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<(), SiteflowError> {
    let phase = PhaseNumber::try_from(phase)?;
    let url = SiteflowError::parse_url(&url)?;

    let config = super::load_config(config_path.as_deref())?;
    let options = PhaseOptions {
        record_id: record,
        allow_rerun: force,
        discovery: config.discovery.clone(),
        timeouts: config.timeouts.clone(),
    };

    let runner = super::build_runner(&config)?;

    let outcome = if no_progress || format == OutputFormat::Json {
        runner.run(phase, &url, &options, None).await?
    } else {
        let (tx, rx) = progress_channel();
        let renderer = spawn_renderer(rx);
        let result = runner.run(phase, &url, &options, Some(&tx)).await;
        drop(tx);
        let _ = renderer.await;
        result?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
        }
        OutputFormat::Text => {
            if outcome.record.is_completed() {
                super::run::print_report(&outcome, verbose);
            } else {
                println!();
                println!(
                    "{} {} completed for {}",
                    "Phase".bold(),
                    phase,
                    outcome.record.url.cyan()
                );
                for advisory in &outcome.advisories {
                    println!("  {} {}", "⚠".yellow(), advisory.yellow());
                }
                println!();
                println!(
                    "  Resume with: {}",
                    format!(
                        "siteflow phase <n> {} --record {}",
                        outcome.record.url, outcome.record.id
                    )
                    .cyan()
                );
            }
        }
    }

    Ok(())
}
