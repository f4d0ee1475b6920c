// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for siteflow.

pub mod discover;
pub mod graph;
pub mod phase;
pub mod run;
pub mod show;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::clients::{HttpExtractor, HttpGenerator};
use crate::config::SiteflowConfig;
use crate::errors::SiteflowError;
use crate::phase::PhaseRunner;
use crate::store::FilesystemStore;

/// Website analysis orchestrator
///
/// Discover pages, run phased framework analysis, and synthesize a report.
#[derive(Parser, Debug)]
#[clap(
    name = "siteflow",
    version,
    about = "Phased website analysis: page discovery, framework scoring, strategic synthesis",
    long_about = None,
    after_help = "Examples:\n\
        siteflow run https://example.com          Full three-phase analysis\n\
        siteflow phase 1 https://example.com      Collection only\n\
        siteflow phase 3 https://example.com --record <id>\n\
        siteflow discover https://example.com     List prioritized subpages\n\
        siteflow show <record-id>                 Dump a stored record\n\n\
        See 'siteflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to .siteflow.yaml in the working directory)
    #[clap(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all three analysis phases against a site
    Run {
        /// Site URL to analyze
        url: String,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,

        /// Maximum subpages to include
        #[clap(long)]
        max_pages: Option<usize>,

        /// Suppress live progress bars
        #[clap(long)]
        no_progress: bool,
    },

    /// Run a single analysis phase
    Phase {
        /// Phase number (1 collection, 2 scoring, 3 synthesis)
        phase: u8,

        /// Site URL to analyze
        url: String,

        /// Resume from an existing record
        #[clap(short, long)]
        record: Option<String>,

        /// Re-run even if the record is already completed
        #[clap(long)]
        force: bool,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,

        /// Suppress live progress bars
        #[clap(long)]
        no_progress: bool,
    },

    /// Discover and prioritize candidate subpages
    Discover {
        /// Seed URL
        url: String,

        /// Maximum candidates returned
        #[clap(long)]
        max_pages: Option<usize>,

        /// Crawl depth from the seed
        #[clap(long)]
        max_depth: Option<usize>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the analysis step graph
    Graph {
        /// Site URL the plan is built for. The plan's shape does not depend
        /// on the site, so a placeholder is used when omitted.
        url: Option<String>,

        /// Restrict to one phase (default: whole pipeline)
        #[clap(short, long)]
        phase: Option<u8>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Dump a stored analysis record as JSON
    Show {
        /// Record identifier
        record_id: String,
    },
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<SiteflowConfig, SiteflowError> {
    match path {
        Some(path) => SiteflowConfig::load(path),
        None => {
            let cwd = std::env::current_dir()?;
            SiteflowConfig::load_from_project(&cwd)
        }
    }
}

/// Wire the live collaborators and the filesystem store into a runner
pub(crate) fn build_runner(config: &SiteflowConfig) -> Result<PhaseRunner, SiteflowError> {
    let cwd = std::env::current_dir()?;
    let generator = HttpGenerator::new(config.generator.clone())?;
    let extractor = HttpExtractor::new()?;
    let store = FilesystemStore::new(config.record_dir(&cwd))?;

    Ok(PhaseRunner::new(
        Arc::new(generator),
        Arc::new(extractor),
        Arc::new(store),
    ))
}

/// Output format for report-producing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}
