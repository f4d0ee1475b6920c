// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Filesystem-based phase store
//!
//! One JSON file per record under the store directory. Writes go through a
//! temp file and rename, which is as atomic as a single-record write needs
//! to be.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{check_version, PhaseStore};
use crate::errors::SiteflowError;
use crate::phase::PhaseRecord;

/// Filesystem-backed store
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at `dir`, creating it if needed
    pub fn new(dir: PathBuf) -> Result<Self, SiteflowError> {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| SiteflowError::StoreError {
                message: format!("failed to create store directory: {e}"),
            })?;
        }
        Ok(Self { dir })
    }

    /// Default project-local store directory
    pub fn default_store(base_dir: PathBuf) -> Result<Self, SiteflowError> {
        Self::new(base_dir.join(".siteflow").join("records"))
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl PhaseStore for FilesystemStore {
    async fn get(&self, id: &str) -> Result<Option<PhaseRecord>, SiteflowError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SiteflowError::StoreError {
                message: format!("failed to read record '{id}': {e}"),
            }
        })?;

        let record = serde_json::from_str(&content).map_err(|e| SiteflowError::StoreError {
            message: format!("failed to parse record '{id}': {e}"),
        })?;

        Ok(Some(record))
    }

    async fn upsert(&self, record: &PhaseRecord) -> Result<(), SiteflowError> {
        let existing = self.get(&record.id).await?;
        check_version(existing.as_ref(), record)?;

        let content = serde_json::to_string_pretty(record)?;
        let path = self.record_path(&record.id);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, content).await.map_err(|e| {
            SiteflowError::StoreError {
                message: format!("failed to write record '{}': {e}", record.id),
            }
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            SiteflowError::StoreError {
                message: format!("failed to commit record '{}': {e}", record.id),
            }
        })?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SiteflowError> {
        let path = self.record_path(id);
        if path.exists() {
            tokio::fs::remove_file(&path).await.map_err(|e| {
                SiteflowError::StoreError {
                    message: format!("failed to delete record '{id}': {e}"),
                }
            })?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, SiteflowError> {
        let mut ids = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            SiteflowError::StoreError {
                message: format!("failed to read store directory: {e}"),
            }
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            SiteflowError::StoreError {
                message: format!("failed to read store entry: {e}"),
            }
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf()).unwrap();

        let mut record = PhaseRecord::new("https://example.com");
        record.bump();
        store.upsert(&record).await.unwrap();

        let loaded = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_conflict_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf()).unwrap();

        let mut record = PhaseRecord::new("https://example.com");
        record.bump();
        store.upsert(&record).await.unwrap();

        // A stale writer that never saw the first write
        let stale = {
            let mut r = record.clone();
            r.version = 1;
            r
        };
        let err = store.upsert(&stale).await.unwrap_err();
        assert!(matches!(err, SiteflowError::VersionConflict { .. }));

        // The well-behaved next write succeeds
        record.bump();
        store.upsert(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf()).unwrap();

        let mut a = PhaseRecord::new("https://a.example");
        a.bump();
        let mut b = PhaseRecord::new("https://b.example");
        b.bump();
        store.upsert(&a).await.unwrap();
        store.upsert(&b).await.unwrap();

        let ids = store.list().await.unwrap();
        assert_eq!(ids.len(), 2);

        store.delete(&a.id).await.unwrap();
        assert!(store.get(&a.id).await.unwrap().is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
