// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Configuration loading
//!
//! Optional project settings from .siteflow.yaml. Every field has a
//! working default, so an absent file is equivalent to an empty one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clients::GeneratorConfig;
use crate::discover::DiscoveryOptions;
use crate::errors::SiteflowError;

pub const CONFIG_FILE: &str = ".siteflow.yaml";

/// Project configuration from .siteflow.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteflowConfig {
    /// Text-generation backend settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Page discovery bounds
    #[serde(default)]
    pub discovery: DiscoveryOptions,

    /// Persistence settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-step-class timeout overrides
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Timeout overrides by step class, in seconds. Unset fields keep the
/// built-in per-step defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub extraction_secs: Option<u64>,
    pub generation_secs: Option<u64>,
}

/// Persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Record directory. Defaults to .siteflow/records under the
    /// working directory.
    pub dir: Option<PathBuf>,
}

impl SiteflowConfig {
    /// Load from file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SiteflowError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from a project directory (looks for .siteflow.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self, SiteflowError> {
        Self::load(&project_root.join(CONFIG_FILE))
    }

    /// Resolved record directory for a project root
    pub fn record_dir(&self, project_root: &Path) -> PathBuf {
        self.store
            .dir
            .clone()
            .unwrap_or_else(|| project_root.join(".siteflow").join("records"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = SiteflowConfig::load(Path::new("/nonexistent/.siteflow.yaml")).unwrap();
        assert_eq!(config.discovery.max_pages, 10);
        assert_eq!(config.generator.model, "gpt-4o-mini");
        assert!(config.store.dir.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "discovery:\n  max_pages: 4\ngenerator:\n  model: gpt-4o\n",
        )
        .unwrap();

        let config = SiteflowConfig::load(&path).unwrap();
        assert_eq!(config.discovery.max_pages, 4);
        assert_eq!(config.discovery.max_depth, 1);
        assert_eq!(config.generator.model, "gpt-4o");
        assert!(config.timeouts.extraction_secs.is_none());
    }

    #[test]
    fn test_timeout_overrides_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "timeouts:\n  generation_secs: 60\n").unwrap();

        let config = SiteflowConfig::load(&path).unwrap();
        assert_eq!(config.timeouts.generation_secs, Some(60));
        assert!(config.timeouts.extraction_secs.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "discovery: [not a map]").unwrap();

        assert!(SiteflowConfig::load(&path).is_err());
    }

    #[test]
    fn test_record_dir_default_and_override() {
        let root = Path::new("/proj");

        let config = SiteflowConfig::default();
        assert_eq!(
            config.record_dir(root),
            PathBuf::from("/proj/.siteflow/records")
        );

        let config = SiteflowConfig {
            store: StoreConfig {
                dir: Some(PathBuf::from("/elsewhere")),
            },
            ..Default::default()
        };
        assert_eq!(config.record_dir(root), PathBuf::from("/elsewhere"));
    }
}
