// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Live step progress rendering
//!
//! Consumes executor progress updates from a channel and renders one
//! progress bar per step. Updates arrive tagged with a step id, so bars
//! are created lazily in the order steps first report.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::pipeline::{StepProgress, StepStatus};

fn step_bar(multi: &MultiProgress, step_id: &str) -> ProgressBar {
    let pb = multi.add(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg:24} [{bar:30.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message(step_id.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Spawn a renderer over a progress channel. Resolves when the sender
/// side is dropped, which the executor does at the end of a run.
pub fn spawn_renderer(mut rx: UnboundedReceiver<StepProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let mut bars: HashMap<String, ProgressBar> = HashMap::new();

        while let Some(update) = rx.recv().await {
            let bar = bars
                .entry(update.step_id.clone())
                .or_insert_with(|| step_bar(&multi, &update.step_id));

            bar.set_position(u64::from(update.progress));

            match update.status {
                StepStatus::Pending | StepStatus::Running => {}
                StepStatus::Completed => {
                    bar.finish_with_message(format!("{} ✓", update.step_id));
                }
                StepStatus::Failed => {
                    let reason = update.error.as_deref().unwrap_or("failed");
                    bar.abandon_with_message(format!("{} ✗ {reason}", update.step_id));
                }
            }
        }

        for bar in bars.values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    })
}
