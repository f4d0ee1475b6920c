// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Show command - dump a stored record

use std::path::PathBuf;

use crate::errors::SiteflowError;
use crate::store::{FilesystemStore, PhaseStore};

pub async fn run(record_id: String, config_path: Option<PathBuf>) -> Result<(), SiteflowError> {
    let config = super::load_config(config_path.as_deref())?;
    let cwd = std::env::current_dir()?;
    let store = FilesystemStore::new(config.record_dir(&cwd))?;

    let record = store
        .get(&record_id)
        .await?
        .ok_or(SiteflowError::RecordNotFound { id: record_id })?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
