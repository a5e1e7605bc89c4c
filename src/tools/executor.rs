// Tool execution engine
//
// Executes tools with permission checks, records every attempt, and notifies
// an optional observer around handler runs.

use crate::errors::ToolError;
use crate::sandbox::{PermissionEvaluator, PolicySnapshot};
use crate::tools::history::{ExecutionHistory, ExecutionRecord};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{ToolCall, ToolContext, ToolDefinition, ToolOutcome};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::types::ToolArguments;

/// Lifecycle notification for an allowed tool call
///
/// Denied and unknown calls never produce events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolEvent {
    Started {
        tool: String,
        arguments: ToolArguments,
    },
    Completed {
        tool: String,
        result: Value,
    },
    Failed {
        tool: String,
        error: String,
    },
}

/// Tool executor - manages tool execution lifecycle
pub struct ToolExecutor {
    registry: ToolRegistry,
    permissions: PermissionEvaluator,
    history: Mutex<ExecutionHistory>,
    events: Option<mpsc::UnboundedSender<ToolEvent>>,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, permissions: PermissionEvaluator) -> Self {
        Self {
            registry,
            permissions,
            history: Mutex::new(ExecutionHistory::new()),
            events: None,
        }
    }

    /// Deliver lifecycle events to `sender`
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<ToolEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Execute a single tool call
    ///
    /// Never fails to the caller: unknown tools, denials and handler errors
    /// all come back as a failed `ToolOutcome`. Every attempt is recorded.
    #[instrument(skip(self, call), fields(tool = %call.tool))]
    pub async fn execute_tool_call(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.registry.get(&call.tool) else {
            warn!("Unknown tool requested: {}", call.tool);
            let error = ToolError::UnknownTool(call.tool.clone()).to_string();
            self.record(ExecutionRecord::failure(&call.tool, &call.arguments, &error));
            return ToolOutcome::failure(error);
        };

        let decision = self.permissions.evaluate(&call.tool, &call.arguments);
        if !decision.allowed {
            info!("Tool execution denied: {}", decision.reason());
            let error = ToolError::PermissionDenied(decision.reason().to_string()).to_string();
            self.record(ExecutionRecord::failure(&call.tool, &call.arguments, &error));
            return ToolOutcome::failure(error);
        }

        info!("Executing tool: {}", call.tool);
        self.notify(ToolEvent::Started {
            tool: call.tool.clone(),
            arguments: call.arguments.clone(),
        });

        let context = ToolContext::new(self.permissions.resolver().clone());
        let run = AssertUnwindSafe(tool.execute(&call.arguments, &context)).catch_unwind();

        let outcome = match run.await {
            Ok(Ok(result)) => {
                debug!("Tool executed successfully");
                ToolOutcome::success(result)
            }
            Ok(Err(e)) => {
                error!("Tool execution failed: {}", e);
                ToolOutcome::failure(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Tool handler panicked: {}", message);
                ToolOutcome::failure(format!("Tool handler panicked: {}", message))
            }
        };

        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                self.record(ExecutionRecord::success(
                    &call.tool,
                    &call.arguments,
                    result.clone(),
                ));
                self.notify(ToolEvent::Completed {
                    tool: call.tool.clone(),
                    result: result.clone(),
                });
            }
            (None, error) => {
                let error = error.clone().unwrap_or_default();
                self.record(ExecutionRecord::failure(&call.tool, &call.arguments, &error));
                self.notify(ToolEvent::Failed {
                    tool: call.tool.clone(),
                    error,
                });
            }
        }

        outcome
    }

    /// Definitions of every registered tool, in catalog order
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Up to `limit` history records, newest first
    pub fn get_history(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.history().recent(limit)
    }

    /// Current sandbox roots
    pub fn policy(&self) -> PolicySnapshot {
        self.permissions.snapshot()
    }

    /// Get reference to registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Get reference to the permission evaluator
    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    fn record(&self, record: ExecutionRecord) {
        self.history().record(record);
    }

    fn history(&self) -> MutexGuard<'_, ExecutionHistory> {
        // A panicking handler never holds this lock, so a poisoned guard still
        // holds consistent data.
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, event: ToolEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("Tool event receiver closed");
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
