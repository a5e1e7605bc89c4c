// list_directory - lists the immediate children of a directory

use crate::errors::ToolError;
use crate::tools::implementations::{format_file_size, format_time};
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Entries stat'ed per listing; `total` still counts every entry
const MAX_ENTRIES: usize = 500;

pub struct ListDirectoryTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and directories"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "Directory path (e.g., ~/Documents, ~/Desktop, ~/Downloads). Use ~ for home directory.",
        )]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let dir = context.resolve(&args.path);

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ToolError::io(format!("Failed to list {}", dir.display()), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::io(format!("Failed to list {}", dir.display()), e))?
        {
            entries.push(entry);
        }
        let total = entries.len();
        entries.sort_by_key(|entry| entry.file_name());

        let mut files = Vec::new();
        let mut directories = Vec::new();

        for entry in entries.into_iter().take(MAX_ENTRIES) {
            let full_path = entry.path();
            // Follows symlinks, so a link to a directory lists as a directory
            let metadata = match tokio::fs::metadata(&full_path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Failed to stat {}: {}", full_path.display(), e);
                    continue;
                }
            };

            let item = json!({
                "name": entry.file_name().to_string_lossy(),
                "path": full_path,
                "size": metadata.len(),
                "size_formatted": format_file_size(metadata.len()),
                "modified": metadata.modified().ok().map(format_time),
            });

            if metadata.is_dir() {
                directories.push(item);
            } else {
                files.push(item);
            }
        }

        Ok(json!({
            "path": dir,
            "files": files,
            "directories": directories,
            "total": total,
        }))
    }
}
