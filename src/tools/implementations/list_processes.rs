// list_processes - snapshot of running processes

use crate::errors::ToolError;
use crate::tools::implementations::format_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sysinfo::System;

const MAX_PROCESSES: usize = 50;
const MAX_COMMAND_CHARS: usize = 100;

pub struct ListProcessesTool;

#[derive(Debug, Serialize)]
struct ProcessRow {
    pid: u32,
    name: String,
    cpu: f32,
    memory: u64,
    memory_formatted: String,
    status: String,
    command: String,
}

#[async_trait]
impl Tool for ListProcessesTool {
    fn name(&self) -> &str {
        "list_processes"
    }

    fn description(&self) -> &str {
        "List running processes (top 50, sorted by CPU usage)"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn execute(
        &self,
        _arguments: &ToolArguments,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        // CPU usage is a delta, so it needs two refreshes apart
        let mut system = System::new_all();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        system.refresh_all();

        let mut rows: Vec<ProcessRow> = system
            .processes()
            .values()
            .map(|process| {
                let command = process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                let command = if command.is_empty() {
                    process.name().to_string_lossy().into_owned()
                } else {
                    command
                };
                ProcessRow {
                    pid: process.pid().as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    cpu: process.cpu_usage(),
                    memory: process.memory(),
                    memory_formatted: format_file_size(process.memory()),
                    status: process.status().to_string(),
                    command: command.chars().take(MAX_COMMAND_CHARS).collect(),
                }
            })
            .collect();

        rows.sort_by_key(|row| row.pid);
        rows.truncate(MAX_PROCESSES);
        rows.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));

        Ok(json!({
            "count": rows.len(),
            "processes": rows,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
