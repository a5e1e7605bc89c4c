// get_file_info - metadata for a single file or directory

use crate::errors::ToolError;
use crate::tools::implementations::{format_file_size, format_optional_time};
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::Metadata;

pub struct FileInfoTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for FileInfoTool {
    fn name(&self) -> &str {
        "get_file_info"
    }

    fn description(&self) -> &str {
        "Get file metadata (size, dates, permissions)"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "File or directory path (e.g., ~/Documents/file.txt). Use ~ for home directory.",
        )]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let path = context.resolve(&args.path);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::io(format!("Cannot access {}", path.display()), e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut info = json!({
            "path": path,
            "name": name,
            "size": metadata.len(),
            "size_formatted": format_file_size(metadata.len()),
            "is_directory": metadata.is_dir(),
            "is_file": metadata.is_file(),
            "modified": format_optional_time(metadata.modified()),
            "accessed": format_optional_time(metadata.accessed()),
            "permissions": permission_bits(&metadata),
        });
        if let Some(created) = format_optional_time(metadata.created()) {
            info["created"] = Value::String(created);
        }
        Ok(info)
    }
}

/// Last three octal digits of the mode, e.g. "644"
#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> Option<String> {
    use std::os::unix::fs::PermissionsExt;
    Some(format!("{:03o}", metadata.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &Metadata) -> Option<String> {
    None
}
