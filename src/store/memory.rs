// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! In-memory phase store
//!
//! Backs ephemeral runs and tests. Same version discipline as the
//! filesystem store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{check_version, PhaseStore};
use crate::errors::SiteflowError;
use crate::phase::PhaseRecord;

/// Map-backed store
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, PhaseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhaseStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<PhaseRecord>, SiteflowError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, record: &PhaseRecord) -> Result<(), SiteflowError> {
        let mut records = self.records.write().await;
        check_version(records.get(&record.id), record)?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SiteflowError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, SiteflowError> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_requires_monotonic_version() {
        let store = MemoryStore::new();
        let mut record = PhaseRecord::new("https://example.com");

        // Version 0 was never bumped; the store refuses it
        let err = store.upsert(&record).await.unwrap_err();
        assert!(matches!(err, SiteflowError::VersionConflict { .. }));

        record.bump();
        store.upsert(&record).await.unwrap();
        assert!(store.get(&record.id).await.unwrap().is_some());
    }
}
