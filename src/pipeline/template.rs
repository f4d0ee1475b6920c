// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Prompt template rendering
//!
//! Substitutes `{{placeholder}}` markers from a typed context and from prior
//! step results. Optional fields resolve to the empty string when absent;
//! required fields fail loudly before any external call is made.

use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::errors::SiteflowError;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("valid regex"))
}

/// Typed prompt context with required and optional fields
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: HashMap<String, String>,
    required: HashSet<String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an optional field. Absent optional fields render as empty string.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Declare a field required. A template referencing a required field with
    /// no value is a configuration error, not a malformed prompt.
    pub fn mark_required(&mut self, key: impl Into<String>) {
        self.required.insert(key.into());
    }

    /// Set a field and declare it required in one call
    pub fn insert_required(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.required.insert(key.clone());
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Render a step's prompt template.
///
/// Placeholders resolve from the context first, then from completed step
/// results keyed by step id (structured results are serialized to JSON).
pub fn render(
    step_id: &str,
    template: &str,
    ctx: &TemplateContext,
    results: &HashMap<String, Value>,
) -> Result<String, SiteflowError> {
    let mut out = String::with_capacity(template.len());
    let mut last_end = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];

        out.push_str(&template[last_end..whole.start()]);

        if let Some(value) = ctx.get(name) {
            out.push_str(value);
        } else if let Some(value) = results.get(name) {
            out.push_str(&value_to_text(value));
        } else if ctx.required.contains(name) {
            return Err(SiteflowError::MissingPlaceholder {
                step: step_id.to_string(),
                placeholder: name.to_string(),
            });
        }
        // Unknown optional placeholder: empty string, some steps are
        // optional enrichments of others.

        last_end = whole.end();
    }

    out.push_str(&template[last_end..]);
    Ok(out)
}

/// Flatten a result value for textual interpolation
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
