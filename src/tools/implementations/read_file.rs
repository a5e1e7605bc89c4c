// read_file - reads text file contents with size and length ceilings

use crate::errors::ToolError;
use crate::tools::implementations::check_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_FILE_MB: u64 = 10;
const MAX_CHARS: usize = 50_000;
const TRUNCATION_MARKER: &str = "\n... (truncated)";

pub struct ReadFileTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "File path to read (e.g., ~/Documents/test.txt). Use ~ for home directory.",
        )]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let path = context.resolve(&args.path);

        check_file_size(&path, MAX_FILE_MB).await?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(format!("Failed to read {}", path.display()), e))?;
        let content = String::from_utf8_lossy(&bytes);

        let char_count = content.chars().count();
        let truncated = char_count > MAX_CHARS;
        let shown = if truncated {
            let mut head: String = content.chars().take(MAX_CHARS).collect();
            head.push_str(TRUNCATION_MARKER);
            head
        } else {
            content.to_string()
        };

        Ok(json!({
            "path": path,
            "content": shown,
            "size": char_count,
            "lines": content.split('\n').count(),
            "truncated": truncated,
        }))
    }
}
