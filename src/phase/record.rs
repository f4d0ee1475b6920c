// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Durable phase record
//!
//! The only entity that outlives a single process invocation. Each phase
//! invocation reads the record, merges its own output in without touching
//! sibling phases, and writes it back. The version field gives the store
//! optimistic concurrency instead of last-write-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::clients::PageSnapshot;
use crate::discover::CandidatePage;
use crate::pipeline::RunSummary;

/// Record lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    InProgress,
    Completed,
}

/// Output of phase 1 (collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase1Output {
    /// Pages the discoverer proposed, in rank order
    pub candidates: Vec<CandidatePage>,

    /// Extracted snapshots, seed first
    pub snapshots: Vec<PageSnapshot>,

    /// True when produced by a later phase's minimal backfill rather than a
    /// full phase-1 run
    pub basic: bool,
}

impl Phase1Output {
    /// Concatenated cleaned text of all snapshots, for scoring prompts
    pub fn combined_text(&self) -> String {
        self.snapshots
            .iter()
            .map(|s| format!("## {}\n{}", s.url, s.cleaned_text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// One analytical framework's score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkScore {
    pub score: f64,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Output of phase 2 (framework scoring)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase2Output {
    /// Scores keyed by framework id, all four present on success
    pub frameworks: BTreeMap<String, FrameworkScore>,
}

impl Phase2Output {
    /// Mean of the framework scores
    pub fn mean_score(&self) -> f64 {
        if self.frameworks.is_empty() {
            return 0.0;
        }
        self.frameworks.values().map(|f| f.score).sum::<f64>() / self.frameworks.len() as f64
    }
}

/// Output of phase 3 (strategic synthesis)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase3Output {
    /// Raw synthesis result from the model
    pub synthesis: Value,

    /// Summary over the synthesis run
    pub summary: RunSummary,
}

/// The durable, mergeable record that lets phases 1–3 be invoked at
/// different times while preserving prior results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: String,
    pub url: String,
    pub status: PhaseStatus,
    pub completed_phases: BTreeSet<u8>,
    pub phase1: Option<Phase1Output>,
    pub phase2: Option<Phase2Output>,
    pub phase3: Option<Phase3Output>,
    /// Final aggregate score, set by phase 3
    pub score: Option<f64>,
    /// Incremented on every write; checked by the store on upsert
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhaseRecord {
    /// Create a fresh record with a new identifier
    pub fn new(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            status: PhaseStatus::InProgress,
            completed_phases: BTreeSet::new(),
            phase1: None,
            phase2: None,
            phase3: None,
            score: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PhaseStatus::Completed
    }

    /// Merge phase-1 output in, leaving sibling phases untouched
    pub fn merge_phase1(&mut self, output: Phase1Output) {
        self.phase1 = Some(output);
        self.completed_phases.insert(1);
        self.updated_at = Utc::now();
    }

    pub fn merge_phase2(&mut self, output: Phase2Output) {
        self.phase2 = Some(output);
        self.completed_phases.insert(2);
        self.updated_at = Utc::now();
    }

    /// Merge phase-3 output and close the record
    pub fn merge_phase3(&mut self, output: Phase3Output, score: f64) {
        self.phase3 = Some(output);
        self.completed_phases.insert(3);
        self.score = Some(score);
        self.status = PhaseStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Bump the version ahead of a write
    pub fn bump(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
