// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Graph command - visualize the analysis step plan

use super::GraphFormat;
use crate::errors::SiteflowError;
use crate::phase::{planned_steps, PhaseNumber};
use crate::pipeline::StepDag;

pub async fn run(
    url: Option<String>,
    phase: Option<u8>,
    format: GraphFormat,
) -> Result<(), SiteflowError> {
    let url = SiteflowError::parse_url(url.as_deref().unwrap_or("https://example.com/"))?;
    let phase = phase.map(PhaseNumber::try_from).transpose()?;

    let steps = planned_steps(phase, &url)?;
    let dag = StepDag::build(&steps)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&steps)?,
        GraphFormat::Dot => dag.to_dot(&steps),
        GraphFormat::Mermaid => dag.to_mermaid(&steps),
    };

    println!("{}", output);

    Ok(())
}
