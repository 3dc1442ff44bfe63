//! Model provider abstraction.
//!
//! The pipeline never loads or hosts a model. Callers load one once, wrap it
//! in an `Arc<dyn ModelProvider>` and hand it to the
//! [`ElementSelector`](crate::ElementSelector).

use crate::error::SelectResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spider_select_types::TokenUsage;

/// Model provider trait for local or remote language models.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a completion request and return the response text.
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> SelectResult<CompletionResponse>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str;

    /// Maximum context length in tokens.
    fn context_window(&self) -> usize {
        4096
    }

    /// Whether the model runs on the local machine.
    fn is_local(&self) -> bool {
        false
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Options for completion requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    /// Temperature, kept low for repeatable selections.
    pub temperature: f32,
    /// Max tokens to generate.
    pub max_tokens: u16,
    /// Request JSON output when the provider supports it.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 256,
            json_mode: true,
        }
    }
}

impl CompletionOptions {
    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u16) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable JSON mode.
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// Response from a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// The generated text.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Create a response.
    pub fn new(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            usage,
        }
    }
}
