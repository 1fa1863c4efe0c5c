//! LLM Service Interface
//!
//! The orchestrator only consumes completions; model invocation itself is an
//! external collaborator behind the [`LlmService`] trait. [`ClaudeLlm`] is
//! the production implementation against the Anthropic Messages API.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Per-call completion options
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_ms: u64,
    /// Correlates calls per user for rate limiting and logs
    pub user_id: String,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.0,
            timeout_ms: 2_500,
            user_id: String::new(),
        }
    }
}

/// Completion provider consumed by the classifiers. Implementations must be
/// safe to call concurrently; failures surface as errors, never as a
/// malformed success.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate_completion(&self, prompt: &str, options: &CompletionOptions)
        -> Result<String>;
}

/// One prior conversation turn, as returned by the external memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Optional durable-history collaborator, consulted only when the recheck
/// bridge's own slot has expired
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Up to `limit` prior turns, ordered oldest-first (chronological).
    /// The recheck bridge scans from the tail to find the newest
    /// search-worthy turn.
    async fn recent_context(&self, user_id: &str, limit: usize) -> Result<Vec<ContextTurn>>;
}

// Anthropic Messages API wire types

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

/// Claude-backed [`LlmService`]
#[derive(Clone)]
pub struct ClaudeLlm {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeLlm {
    /// Fails fast when the key is missing: classification without a model is
    /// a deployment choice, not something to discover per request.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("ANTHROPIC_API_KEY is empty - LLM classification unavailable");
        }
        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl LlmService for ClaudeLlm {
    async fn generate_completion(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!(
            "Calling Claude: model={}, user={}, prompt_len={}",
            self.model,
            options.user_id,
            prompt.len()
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(std::time::Duration::from_millis(options.timeout_ms))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("Claude API error {}: {}", status, text);
        }

        let result: MessageResponse = response.json().await?;
        let content = result
            .content
            .into_iter()
            .filter_map(|b| if b.r#type == "text" { b.text } else { None })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected_at_construction() {
        assert!(ClaudeLlm::new("").is_err());
        assert!(ClaudeLlm::new("   ").is_err());
        assert!(ClaudeLlm::new("sk-test").is_ok());
    }
}
