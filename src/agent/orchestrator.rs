// Agent orchestrator - bounded multi-turn tool-calling loop
//
// Streams a turn from the engine through the tool call detector, runs a
// detected call through the executor, and feeds the result back as the next
// prompt. One request at a time per orchestrator.

use crate::agent::detector::StreamingToolCallDetector;
use crate::agent::engine::{ChatMessage, GenerationEngine, GenerationOptions, GenerationRequest};
use crate::agent::prompt::ToolPromptFormatter;
use crate::errors::AgentError;
use crate::tools::executor::ToolExecutor;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_TURNS: usize = 5;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant running locally on the user's computer.";

/// Agent behavior knobs
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Upper bound on generate/execute rounds per request
    pub max_turns: usize,
    pub generation: GenerationOptions,
    /// Prepended to the tool catalog in the system prompt
    pub system_prompt: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            generation: GenerationOptions::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// A turn finished without a tool call
    Answered,
    /// A tool call failed; the failure was shown to the user
    ToolFailed,
    /// Every turn produced a tool call
    TurnLimitReached,
    /// `stop_generation` was called
    Cancelled,
}

/// Result of one agent request
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub text: String,
    pub status: AgentStatus,
    pub turns: usize,
    pub total_chunks: usize,
}

enum StreamEnd {
    Completed,
    Cancelled,
}

/// Clears the in-flight flag when the request ends, however it ends
struct GenerationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> GenerationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives the generation engine and tool executor for one session
pub struct AgentOrchestrator {
    engine: Arc<dyn GenerationEngine>,
    executor: Arc<ToolExecutor>,
    options: AgentOptions,
    agent_enabled: AtomicBool,
    generating: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl AgentOrchestrator {
    pub fn new(
        engine: Arc<dyn GenerationEngine>,
        executor: Arc<ToolExecutor>,
        options: AgentOptions,
    ) -> Self {
        Self {
            engine,
            executor,
            options,
            agent_enabled: AtomicBool::new(true),
            generating: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Turn tool calling on (the default)
    pub fn enable_agent(&self) {
        self.agent_enabled.store(true, Ordering::Release);
    }

    /// Turn tool calling off: requests become plain streaming generations
    pub fn disable_agent(&self) {
        self.agent_enabled.store(false, Ordering::Release);
    }

    pub fn is_agent_enabled(&self) -> bool {
        self.agent_enabled.load(Ordering::Acquire)
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Cancel the in-flight request, if any
    ///
    /// Takes effect between streamed chunks and while a tool runs.
    pub fn stop_generation(&self) {
        let token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_generating() {
            info!("Stopping generation");
            token.cancel();
        }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Answer `user_message`, streaming user-visible text to `on_token`
    ///
    /// Rejected with `AgentError::Busy` while another request is in flight.
    #[instrument(skip(self, user_message, on_token), fields(engine = %self.engine.name()))]
    pub async fn run<F>(&self, user_message: &str, mut on_token: F) -> Result<AgentResponse, AgentError>
    where
        F: FnMut(&str) + Send,
    {
        let (_guard, cancel) = self.begin().ok_or_else(|| {
            warn!("Rejected request: already generating");
            AgentError::Busy
        })?;

        if !self.is_agent_enabled() {
            return self.run_plain(user_message, &cancel, on_token).await;
        }

        let roots = self.executor.policy().allowed_directories;
        let system_prompt = ToolPromptFormatter::build_system_prompt(
            &self.options.system_prompt,
            &self.executor.list_tools(),
            &roots,
        );
        let mut transcript = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_message),
        ];

        let mut streamed = String::new();
        let mut total_chunks = 0;

        for turn in 1..=self.options.max_turns {
            debug!(turn, "Starting turn");
            let request = GenerationRequest::new(transcript.clone())
                .with_options(self.options.generation);
            let mut detector = StreamingToolCallDetector::new();

            let end = self
                .stream(&request, &cancel, |chunk| {
                    total_chunks += 1;
                    let released = detector.push(chunk);
                    if !released.is_empty() {
                        on_token(&released);
                        streamed.push_str(&released);
                    }
                })
                .await?;

            if let StreamEnd::Cancelled = end {
                return Ok(cancelled(streamed, turn, total_chunks));
            }

            let tail = detector.finish();
            if !tail.is_empty() {
                on_token(&tail);
                streamed.push_str(&tail);
            }

            let turn_text = detector.text().to_string();
            let Some(call) = detector.into_tool_call() else {
                info!(turn, "Turn answered without a tool call");
                return Ok(AgentResponse {
                    text: turn_text,
                    status: AgentStatus::Answered,
                    turns: turn,
                    total_chunks,
                });
            };

            if cancel.is_cancelled() {
                return Ok(cancelled(streamed, turn, total_chunks));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(tool = %call.tool, "Cancelled during tool execution");
                    return Ok(cancelled(streamed, turn, total_chunks));
                }
                outcome = self.executor.execute_tool_call(&call) => outcome,
            };
            if !outcome.success {
                let failure = ToolPromptFormatter::format_tool_failure(outcome.error_message());
                on_token(&failure);
                return Ok(AgentResponse {
                    text: failure,
                    status: AgentStatus::ToolFailed,
                    turns: turn,
                    total_chunks,
                });
            }

            let result = outcome.result.unwrap_or(Value::Null);
            transcript.push(ChatMessage::assistant(turn_text));
            transcript.push(ChatMessage::user(ToolPromptFormatter::format_tool_result(
                &call.tool, &result,
            )));
        }

        warn!(
            max_turns = self.options.max_turns,
            "Turn limit reached with a tool call on every turn"
        );
        Ok(AgentResponse {
            text: streamed,
            status: AgentStatus::TurnLimitReached,
            turns: self.options.max_turns,
            total_chunks,
        })
    }

    /// One generation with no tool detection
    async fn run_plain<F>(
        &self,
        user_message: &str,
        cancel: &CancellationToken,
        mut on_token: F,
    ) -> Result<AgentResponse, AgentError>
    where
        F: FnMut(&str) + Send,
    {
        let mut messages = Vec::new();
        if !self.options.system_prompt.trim().is_empty() {
            messages.push(ChatMessage::system(self.options.system_prompt.clone()));
        }
        messages.push(ChatMessage::user(user_message));
        let request = GenerationRequest::new(messages).with_options(self.options.generation);

        let mut text = String::new();
        let mut total_chunks = 0;
        let end = self
            .stream(&request, cancel, |chunk| {
                total_chunks += 1;
                on_token(chunk);
                text.push_str(chunk);
            })
            .await?;

        Ok(AgentResponse {
            text,
            status: match end {
                StreamEnd::Completed => AgentStatus::Answered,
                StreamEnd::Cancelled => AgentStatus::Cancelled,
            },
            turns: 1,
            total_chunks,
        })
    }

    /// Feed every streamed chunk to `on_chunk` until the stream ends or is cancelled
    async fn stream<F>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> Result<StreamEnd, AgentError>
    where
        F: FnMut(&str) + Send,
    {
        let mut rx = self
            .engine
            .generate_stream(request)
            .await
            .map_err(AgentError::Generation)?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Generation cancelled");
                    return Ok(StreamEnd::Cancelled);
                }
                item = rx.recv() => match item {
                    Some(Ok(chunk)) => on_chunk(&chunk),
                    Some(Err(e)) => return Err(AgentError::Generation(e)),
                    None => return Ok(StreamEnd::Completed),
                },
            }
        }
    }

    /// Mark a request in flight and install its cancellation token
    ///
    /// Both happen under the token lock, so `stop_generation` never sees the
    /// flag set alongside the previous request's token.
    fn begin(&self) -> Option<(GenerationGuard<'_>, CancellationToken)> {
        let mut slot = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        let guard = GenerationGuard::acquire(&self.generating)?;
        let token = CancellationToken::new();
        *slot = token.clone();
        Some((guard, token))
    }
}

fn cancelled(text: String, turns: usize, total_chunks: usize) -> AgentResponse {
    AgentResponse {
        text,
        status: AgentStatus::Cancelled,
        turns,
        total_chunks,
    }
}
