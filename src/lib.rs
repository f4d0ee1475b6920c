// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! # siteflow - Website Analysis Orchestrator
//!
//! `siteflow` runs phased, resumable website analysis: it discovers a site's
//! key subpages, executes a dependency-ordered pipeline of extraction and
//! generative-analysis steps, and merges the results into a persisted record.
//!
//! ## Features
//!
//! - **Page discovery** - Find and prioritize pricing, product, and blog pages
//! - **Step orchestration** - DAG-ordered steps with timeouts and live progress
//! - **Phased analysis** - Collection, framework scoring, and synthesis run
//!   independently and resume from stored state
//! - **Durable records** - Versioned JSON records with conflict detection
//!
//! ## Quick Start
//!
//! ```bash
//! # Full three-phase analysis
//! siteflow run https://example.com
//!
//! # Phase at a time, resuming a record
//! siteflow phase 1 https://example.com
//! siteflow phase 2 https://example.com --record <id>
//!
//! # See what would run
//! siteflow graph https://example.com --format mermaid
//! ```

pub mod cli;
pub mod clients;
pub mod config;
pub mod discover;
pub mod errors;
pub mod phase;
pub mod pipeline;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use errors::{SiteflowError, SiteflowResult};
pub use phase::{PhaseNumber, PhaseRecord, PhaseRunner};
pub use pipeline::{PipelineRun, Step, StepExecutor, StepProgress};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
