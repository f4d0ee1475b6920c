// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Error types for siteflow
//!
//! Errors are split along the taxonomy the CLI cares about: configuration
//! errors are rejected before any external call, execution errors carry the
//! failing step or phase, and persistence errors are always fatal to a phase
//! invocation.

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Result type for siteflow operations
pub type SiteflowResult<T> = Result<T, SiteflowError>;

/// Main error type for siteflow
#[derive(Error, Debug, Diagnostic)]
pub enum SiteflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    #[diagnostic(
        code(siteflow::unknown_dependency),
        help("Check that '{dependency}' is defined in the step set")
    )]
    UnknownDependency { step: String, dependency: String },

    #[error("Step '{step}' was scheduled before its dependency '{dependency}' produced a result")]
    #[diagnostic(
        code(siteflow::missing_dependency),
        help("This is a step-set configuration fault, not a runtime condition")
    )]
    MissingDependency { step: String, dependency: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(siteflow::circular_dependency),
        help("Review step dependencies to remove the cycle")
    )]
    CircularDependency { steps: Vec<String> },

    #[error("Duplicate step id '{step}'")]
    #[diagnostic(code(siteflow::duplicate_step))]
    DuplicateStep { step: String },

    #[error("Invalid phase number: {value}")]
    #[diagnostic(
        code(siteflow::invalid_phase),
        help("Valid phases are 1 (collection), 2 (framework scoring), 3 (synthesis)")
    )]
    InvalidPhase { value: String },

    #[error("Invalid URL '{url}': {reason}")]
    #[diagnostic(code(siteflow::invalid_url))]
    InvalidUrl { url: String, reason: String },

    #[error("Prompt for step '{step}' references required placeholder '{placeholder}' with no value")]
    #[diagnostic(
        code(siteflow::missing_placeholder),
        help("Required context fields must be populated before the step runs")
    )]
    MissingPlaceholder { step: String, placeholder: String },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(siteflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' timed out after {timeout:?}")]
    #[diagnostic(code(siteflow::step_timeout))]
    StepTimeout { step: String, timeout: Duration },

    #[error("Step '{step}' failed: {reason}")]
    #[diagnostic(code(siteflow::step_failed))]
    StepFailed {
        step: String,
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' returned malformed structured output")]
    #[diagnostic(
        code(siteflow::parse_error),
        help("The step requested JSON output but the response could not be parsed")
    )]
    ParseError { step: String, message: String },

    #[error("Phase {phase} failed: {reason}")]
    #[diagnostic(code(siteflow::phase_failed))]
    PhaseFailed { phase: u8, reason: String },

    #[error("Content extraction failed for {url}: {message}")]
    #[diagnostic(code(siteflow::extraction_failed))]
    ExtractionFailed { url: String, message: String },

    #[error("Generative-text call failed: {message}")]
    #[diagnostic(code(siteflow::generation_failed))]
    GenerationFailed { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Store error: {message}")]
    #[diagnostic(code(siteflow::store_error))]
    StoreError { message: String },

    #[error("Record '{id}' not found")]
    #[diagnostic(code(siteflow::record_not_found))]
    RecordNotFound { id: String },

    #[error("Record '{id}' was modified concurrently (expected version {expected}, found {found})")]
    #[diagnostic(
        code(siteflow::version_conflict),
        help("Another invocation wrote this record first. Re-read and retry.")
    )]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("Record '{id}' is already completed")]
    #[diagnostic(
        code(siteflow::record_completed),
        help("Pass --force to regenerate over a completed record")
    )]
    RecordCompleted { id: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(siteflow::io_error))]
    Io { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(siteflow::json_error))]
    Json { message: String },

    #[error("YAML error: {message}")]
    #[diagnostic(code(siteflow::yaml_error))]
    Yaml { message: String },

    #[error("HTTP error: {message}")]
    #[diagnostic(code(siteflow::http_error))]
    Http { message: String },
}

impl From<std::io::Error> for SiteflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_json::Error> for SiteflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for SiteflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<reqwest::Error> for SiteflowError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http { message: e.to_string() }
    }
}

impl SiteflowError {
    /// Parse a URL, attaching the offending string to the error
    pub fn parse_url(raw: &str) -> SiteflowResult<url::Url> {
        url::Url::parse(raw).map_err(|e| Self::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// True for errors raised before any external call is made
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownDependency { .. }
                | Self::MissingDependency { .. }
                | Self::CircularDependency { .. }
                | Self::DuplicateStep { .. }
                | Self::InvalidPhase { .. }
                | Self::InvalidUrl { .. }
                | Self::MissingPlaceholder { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Process exit code for the CLI: 2 for validation/configuration faults,
    /// 1 for execution and persistence failures
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_exit_2() {
        let err = SiteflowError::InvalidPhase { value: "7".into() };
        assert!(err.is_configuration());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_execution_errors_exit_1() {
        let err = SiteflowError::StepTimeout {
            step: "score".into(),
            timeout: Duration::from_secs(20),
        };
        assert!(!err.is_configuration());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_parse_url_attaches_input() {
        let err = SiteflowError::parse_url("not a url").unwrap_err();
        match err {
            SiteflowError::InvalidUrl { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
