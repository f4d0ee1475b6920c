// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! HTTP-backed generative-text client
//!
//! Posts a rendered prompt to a chat-completions style endpoint and returns
//! the model's text. Per-step timeouts are enforced by the executor, so the
//! client itself stays deadline-free.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::errors::SiteflowError;

/// Endpoint configuration for the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Chat-completions endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "SITEFLOW_API_KEY".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Text generator backed by reqwest
pub struct HttpGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, SiteflowError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            SiteflowError::InvalidConfig {
                reason: format!("API key environment variable '{}' is not set", config.api_key_env),
                help: Some(format!("export {}=<your key>", config.api_key_env)),
            }
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("siteflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config, api_key })
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SiteflowError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SiteflowError::GenerationFailed { message: e.to_string() })?;

        if !response.status().is_success() {
            return Err(SiteflowError::GenerationFailed {
                message: format!("HTTP {}", response.status()),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SiteflowError::GenerationFailed { message: e.to_string() })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SiteflowError::GenerationFailed {
                message: "response contained no choices".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.api_key_env, "SITEFLOW_API_KEY");
        assert!(config.endpoint.starts_with("https://"));
    }
}
