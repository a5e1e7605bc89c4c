// search_files - recursive file name search under a directory

use crate::errors::ToolError;
use crate::tools::implementations::{format_file_size, format_time};
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;
use walkdir::WalkDir;

const MAX_MATCHES: usize = 100;
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SearchFilesTool;

#[derive(Deserialize)]
struct Args {
    pattern: String,
    directory: String,
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files by name pattern (glob)"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required(
                "pattern",
                "string",
                "Search pattern (e.g., *.log, **/*.json)",
            ),
            ParameterSpec::required(
                "directory",
                "string",
                "Directory to search in (e.g., ~/Documents, ~/Desktop). Use ~ for home directory.",
            ),
        ]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let directory = context.resolve(&args.directory);
        let pattern = Pattern::new(&args.pattern).map_err(|e| {
            ToolError::InvalidArguments(format!("Invalid glob pattern {}: {}", args.pattern, e))
        })?;

        let deadline = Instant::now() + SEARCH_TIMEOUT;
        let root = directory.clone();
        let search = tokio::task::spawn_blocking(move || find_matches(&root, &pattern, deadline));

        let files = tokio::time::timeout(SEARCH_TIMEOUT, search)
            .await
            .map_err(|_| timeout_error())?
            .map_err(|e| ToolError::Subprocess(format!("Search failed: {}", e)))??;

        Ok(json!({
            "pattern": args.pattern,
            "directory": directory,
            "count": files.len(),
            "files": files,
        }))
    }
}

fn timeout_error() -> ToolError {
    ToolError::Timeout {
        operation: "File search".to_string(),
        timeout: SEARCH_TIMEOUT,
    }
}

/// Whether `path` (beneath `root`) matches `pattern`
///
/// Patterns with a `/` match the path relative to the root, others only the
/// file name. Only `**` crosses directory separators.
fn matches(pattern: &Pattern, root: &Path, path: &Path) -> bool {
    if pattern.as_str().contains('/') {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        path.strip_prefix(root)
            .map(|relative| pattern.matches_path_with(relative, options))
            .unwrap_or(false)
    } else {
        path.file_name()
            .map(|name| pattern.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

fn find_matches(root: &Path, pattern: &Pattern, deadline: Instant) -> Result<Vec<Value>, ToolError> {
    if !root.is_dir() {
        return Err(ToolError::InvalidArguments(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        if Instant::now() > deadline {
            return Err(timeout_error());
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !matches(pattern, root, entry.path()) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let path: PathBuf = entry.path().to_path_buf();
        results.push(json!({
            "path": path,
            "name": entry.file_name().to_string_lossy(),
            "size": metadata.len(),
            "size_formatted": format_file_size(metadata.len()),
            "modified": metadata.modified().ok().map(format_time),
        }));

        if results.len() >= MAX_MATCHES {
            break;
        }
    }
    Ok(results)
}
