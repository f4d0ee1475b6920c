// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Persistence layer for phase records
//!
//! Keyed get/upsert of `PhaseRecord` by identifier. Upserts are
//! version-checked: a record whose version does not follow the stored one is
//! rejected rather than silently winning the write race.

mod filesystem;
mod memory;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::errors::SiteflowError;
use crate::phase::PhaseRecord;

/// Trait for phase-record stores
#[async_trait]
pub trait PhaseStore: Send + Sync {
    /// Fetch a record by identifier
    async fn get(&self, id: &str) -> Result<Option<PhaseRecord>, SiteflowError>;

    /// Write a record. The record's version must be exactly one ahead of the
    /// stored version (or 1 for a first write); anything else is a
    /// `VersionConflict`.
    async fn upsert(&self, record: &PhaseRecord) -> Result<(), SiteflowError>;

    /// Remove a record
    async fn delete(&self, id: &str) -> Result<(), SiteflowError>;

    /// List stored record identifiers
    async fn list(&self) -> Result<Vec<String>, SiteflowError>;
}

/// Shared version check for store implementations
pub(crate) fn check_version(
    existing: Option<&PhaseRecord>,
    incoming: &PhaseRecord,
) -> Result<(), SiteflowError> {
    let stored_version = existing.map(|r| r.version).unwrap_or(0);
    if incoming.version != stored_version + 1 {
        return Err(SiteflowError::VersionConflict {
            id: incoming.id.clone(),
            expected: stored_version + 1,
            found: incoming.version,
        });
    }
    Ok(())
}
