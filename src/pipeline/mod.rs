// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Analysis pipeline
//!
//! Step definitions, the dependency DAG, the executor that drives external
//! collaborators, prompt templating, and run summarization.

mod dag;
mod definition;
mod executor;
pub mod template;
mod summary;

pub use dag::StepDag;
pub use definition::{
    OutputFormat, PipelineRun, Step, StepKind, StepProgress, StepStatus,
};
pub use executor::{progress_channel, ProgressSender, StepExecutor};
pub use summary::{summarize, RunSummary};
pub use template::TemplateContext;
