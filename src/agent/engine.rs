// Generation engine abstraction
//
// The orchestrator drives any engine that can stream text for a chat
// transcript. Engines are stateless: every request carries the full transcript.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Receiver;

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One transcript message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options for one generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// A streaming generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// The prompt being answered (content of the last message)
    pub fn prompt(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Trait for text-generation engines
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Start a generation and stream text chunks
    ///
    /// The channel closes when generation is complete. A mid-stream failure
    /// arrives as an `Err` item.
    async fn generate_stream(&self, request: &GenerationRequest) -> Result<Receiver<Result<String>>>;

    /// Engine name for logs (e.g., "openai-compatible")
    fn name(&self) -> &str;
}
