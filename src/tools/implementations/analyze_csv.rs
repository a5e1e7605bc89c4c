// analyze_csv - header, row count and a preview of a CSV file

use crate::errors::ToolError;
use crate::tools::implementations::check_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const MAX_FILE_MB: u64 = 20;
const PREVIEW_ROWS: usize = 100;
const SAMPLE_ROWS: usize = 5;

pub struct AnalyzeCsvTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for AnalyzeCsvTool {
    fn name(&self) -> &str {
        "analyze_csv"
    }

    fn description(&self) -> &str {
        "Parse and analyze CSV file (first 100 rows)"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "CSV file path (e.g., ~/Downloads/data.csv). Use ~ for home directory.",
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

        let lines: Vec<&str> = content
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect();
        let Some((header_line, data_lines)) = lines.split_first() else {
            return Err(ToolError::Parse("CSV file is empty".to_string()));
        };

        let headers: Vec<String> = header_line
            .split(',')
            .map(|h| strip_quotes(h.trim()).to_string())
            .collect();

        let preview: Vec<Value> = data_lines
            .iter()
            .take(PREVIEW_ROWS)
            .map(|line| {
                let values = parse_csv_line(line);
                let row: Map<String, Value> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let value = values.get(i).map(|v| v.trim()).unwrap_or_default();
                        (header.clone(), Value::String(value.to_string()))
                    })
                    .collect();
                Value::Object(row)
            })
            .collect();

        Ok(json!({
            "file": path,
            "total_rows": data_lines.len(),
            "column_count": headers.len(),
            "columns": headers,
            "sample": preview.iter().take(SAMPLE_ROWS).collect::<Vec<_>>(),
            "preview": preview,
        }))
    }
}

/// Remove one leading and one trailing double quote
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

/// Split one CSV line on commas outside double quotes
///
/// Quote characters toggle quoting and are dropped; fields are trimmed.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
