// Execution history - bounded audit log of tool calls
//
// Newest first. Used for auditing and debugging only, never for policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use super::types::ToolArguments;

/// Maximum number of records kept
pub const HISTORY_CAPACITY: usize = 100;

/// One tool call attempt, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub tool: String,
    pub arguments: ToolArguments,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn success(tool: &str, arguments: &ToolArguments, result: Value) -> Self {
        Self::new(tool, arguments, Some(result), None)
    }

    pub fn failure(tool: &str, arguments: &ToolArguments, error: impl Into<String>) -> Self {
        Self::new(tool, arguments, None, Some(error.into()))
    }

    fn new(
        tool: &str,
        arguments: &ToolArguments,
        result: Option<Value>,
        error: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool: tool.to_string(),
            arguments: arguments.clone(),
            success: error.is_none(),
            result,
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only ring of the most recent records, oldest evicted first
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new()
    }
}
