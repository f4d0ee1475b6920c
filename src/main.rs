// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! siteflow - Website Analysis Orchestrator
//!
//! Phased website analysis: page discovery, framework scoring, synthesis.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siteflow::cli::{Cli, Commands};
use siteflow::SiteflowError;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let result = dispatch(cli).await;

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn dispatch(cli: Cli) -> Result<(), SiteflowError> {
    match cli.command {
        Commands::Run {
            url,
            format,
            max_pages,
            no_progress,
        } => {
            siteflow::cli::run::run(url, format, max_pages, no_progress, cli.config, cli.verbose)
                .await
        }
        Commands::Phase {
            phase,
            url,
            record,
            force,
            format,
            no_progress,
        } => {
            siteflow::cli::phase::run(
                phase,
                url,
                record,
                force,
                format,
                no_progress,
                cli.config,
                cli.verbose,
            )
            .await
        }
        Commands::Discover {
            url,
            max_pages,
            max_depth,
            format,
        } => {
            siteflow::cli::discover::run(url, max_pages, max_depth, format, cli.config, cli.verbose)
                .await
        }
        Commands::Graph { url, phase, format } => {
            siteflow::cli::graph::run(url, phase, format).await
        }
        Commands::Show { record_id } => siteflow::cli::show::run(record_id, cli.config).await,
    }
}
