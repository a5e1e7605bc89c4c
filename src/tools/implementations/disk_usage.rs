// get_disk_usage - largest children of a directory, sized by `du`

use crate::errors::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

const TOP_ITEMS: usize = 20;
const DU_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;
/// Paths passed to one `du` invocation
const DU_BATCH: usize = 256;

static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\d.]+)\s*([BKMGT]B?)$").expect("valid size regex"));

pub struct DiskUsageTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[derive(Debug)]
struct UsageItem {
    full_path: String,
    size: String,
    size_bytes: u64,
}

#[async_trait]
impl Tool for DiskUsageTool {
    fn name(&self) -> &str {
        "get_disk_usage"
    }

    fn description(&self) -> &str {
        "Get disk usage statistics for a directory (top 20 largest items). Only ~/Documents, ~/Desktop, ~/Downloads are accessible."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "Directory path to analyze (e.g., ~/Documents, ~/Desktop, ~/Downloads). Use ~ for home directory.",
        )]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let dir = context.resolve(&args.path);

        let children = visible_children(&dir).await?;
        debug!("Sizing {} entries under {}", children.len(), dir.display());

        let output = tokio::time::timeout(DU_TIMEOUT, run_du(&children))
            .await
            .map_err(|_| ToolError::Timeout {
                operation: "Disk usage analysis".to_string(),
                timeout: DU_TIMEOUT,
            })??;

        let mut items = parse_du_output(&output);
        items.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        let total_items = items.len();

        let top: Vec<Value> = items
            .into_iter()
            .take(TOP_ITEMS)
            .map(|item| {
                let relative = Path::new(&item.full_path)
                    .strip_prefix(&dir)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| item.full_path.clone());
                json!({
                    "path": relative,
                    "full_path": item.full_path,
                    "size": item.size,
                    "size_bytes": item.size_bytes,
                })
            })
            .collect();

        Ok(json!({
            "directory": dir,
            "items": top,
            "total_items": total_items,
        }))
    }
}

/// Non-hidden children of `dir`, sorted by name
async fn visible_children(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ToolError::io(format!("Failed to list {}", dir.display()), e))?;

    let mut children = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ToolError::io(format!("Failed to list {}", dir.display()), e))?
    {
        if !entry.file_name().to_string_lossy().starts_with('.') {
            children.push(entry.path());
        }
    }
    children.sort();
    Ok(children)
}

/// Run `du -sh` over `paths` in batches, without a shell, and collect stdout
async fn run_du(paths: &[PathBuf]) -> Result<String, ToolError> {
    let mut output = Vec::new();

    for batch in paths.chunks(DU_BATCH) {
        let mut child = Command::new("du")
            .arg("-sh")
            .arg("--")
            .args(batch)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Subprocess(format!("Disk usage analysis failed: {}", e)))?;

        let remaining = MAX_OUTPUT_BYTES.saturating_sub(output.len() as u64);
        if let Some(stdout) = child.stdout.take() {
            stdout
                .take(remaining)
                .read_to_end(&mut output)
                .await
                .map_err(|e| ToolError::io("Failed to read du output", e))?;
        }

        let truncated = output.len() as u64 >= MAX_OUTPUT_BYTES;
        if truncated {
            let _ = child.start_kill();
        }

        // Non-zero exit just means some entries were unreadable
        let status = child
            .wait()
            .await
            .map_err(|e| ToolError::Subprocess(format!("Disk usage analysis failed: {}", e)))?;
        if !status.success() {
            debug!("du exited with {}", status);
        }

        if truncated {
            warn!("du output reached {} bytes, ignoring the rest", MAX_OUTPUT_BYTES);
            break;
        }
    }

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn parse_du_output(output: &str) -> Vec<UsageItem> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(size, path)| UsageItem {
            full_path: path.to_string(),
            size: size.to_string(),
            size_bytes: parse_size_to_bytes(size),
        })
        .collect()
}

/// Convert a `du -h` size token ("24K", "4.0KB", "1.5G", "0B") to bytes
///
/// Unparsable tokens count as zero.
pub fn parse_size_to_bytes(token: &str) -> u64 {
    let cleaned = token.trim().to_uppercase();
    let Some(caps) = SIZE_TOKEN.captures(&cleaned) else {
        debug!("Failed to parse size: {}", token);
        return 0;
    };

    let Ok(value) = caps[1].parse::<f64>() else {
        return 0;
    };
    let multiplier: u64 = match &caps[2] {
        "K" | "KB" => 1024,
        "M" | "MB" => 1024u64.pow(2),
        "G" | "GB" => 1024u64.pow(3),
        "T" | "TB" => 1024u64.pow(4),
        _ => 1,
    };
    (value * multiplier as f64) as u64
}
