// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Phased analysis: persisted records and the three-phase state machine

mod record;
mod runner;

pub use record::{
    FrameworkScore, Phase1Output, Phase2Output, Phase3Output, PhaseRecord, PhaseStatus,
};
pub use runner::{planned_steps, PhaseNumber, PhaseOptions, PhaseOutcome, PhaseRunner, FRAMEWORKS};
