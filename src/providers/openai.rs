// OpenAI-compatible streaming engine
//
// Talks to a local generation server exposing `/v1/chat/completions`
// (llama.cpp server, Ollama, LM Studio, vLLM).

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::agent::engine::{ChatMessage, GenerationEngine, GenerationRequest};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_MODEL: &str = "local";

const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Streaming engine for any server speaking the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiCompatibleEngine {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleEngine {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_chat_request<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl GenerationEngine for OpenAiCompatibleEngine {
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let (tx, rx) = mpsc::channel(100);
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(url = %url, messages = request.messages.len(), "Sending streaming request");

        let mut builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&self.to_chat_request(request));
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send streaming request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Generation request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        // Spawn task to parse SSE stream
        tokio::spawn(async move {
            tracing::debug!("[STREAM] streaming task started");
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();

            'read: while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("Stream error: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                };
                buffer.extend_from_slice(&bytes);

                // Parse line by line
                while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    let line = String::from_utf8_lossy(&line_bytes);

                    match parse_sse_line(&line) {
                        SseLine::Delta(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                break 'read;
                            }
                        }
                        SseLine::Done => {
                            tracing::debug!("[STREAM] Received [DONE]");
                            break 'read;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            tracing::debug!("[STREAM] streaming task finished");
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

/// Interpret one SSE line: `data: {...}` carries a delta, `data: [DONE]` ends
/// the stream, anything else (comments, keep-alives, role-only deltas) is skipped
fn parse_sse_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseLine::Delta)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            tracing::warn!("Skipping unparseable stream chunk: {}", e);
            SseLine::Skip
        }
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::engine::GenerationOptions;

    #[test]
    fn test_parse_sse_lines() {
        assert_eq!(
            parse_sse_line("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n"),
            SseLine::Delta("Hi".to_string())
        );
        assert_eq!(parse_sse_line("data: [DONE]\n"), SseLine::Done);
        assert_eq!(
            parse_sse_line("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}"),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(": keep-alive\n"), SseLine::Skip);
        assert_eq!(parse_sse_line("data: not json\n"), SseLine::Skip);
    }

    #[test]
    fn test_request_wire_format() {
        let engine = OpenAiCompatibleEngine::new("http://localhost:8080/", "qwen").unwrap();
        assert_eq!(engine.base_url(), "http://localhost:8080");

        let request = GenerationRequest::new(vec![ChatMessage::user("hello")]).with_options(
            GenerationOptions {
                temperature: 0.5,
                max_tokens: 64,
            },
        );
        let json = serde_json::to_value(engine.to_chat_request(&request)).unwrap();
        assert_eq!(json["model"], "qwen");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_stream_from_server() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\", world\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let engine = OpenAiCompatibleEngine::new(server.url(), "local")
            .unwrap()
            .with_api_key("secret");
        let request = GenerationRequest::new(vec![ChatMessage::user("hi")]);
        let mut rx = engine.generate_stream(&request).await.unwrap();

        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            text.push_str(&chunk.unwrap());
        }
        assert_eq!(text, "Hello, world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_fails_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("model not loaded")
            .create_async()
            .await;

        let engine = OpenAiCompatibleEngine::new(server.url(), "local").unwrap();
        let request = GenerationRequest::new(vec![ChatMessage::user("hi")]);
        let err = engine.generate_stream(&request).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("model not loaded"));
    }
}
