// analyze_json - parses a JSON file and summarizes its shape

use crate::errors::ToolError;
use crate::tools::implementations::check_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const MAX_FILE_MB: u64 = 20;
const MAX_DEPTH: usize = 3;
const MAX_KEYS_PER_LEVEL: usize = 10;

pub struct AnalyzeJsonTool;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for AnalyzeJsonTool {
    fn name(&self) -> &str {
        "analyze_json"
    }

    fn description(&self) -> &str {
        "Parse and analyze JSON file structure"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "path",
            "string",
            "JSON file path (e.g., ~/Documents/data.json). Use ~ for home directory.",
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
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io(format!("Failed to read {}", path.display()), e))?;
        let data: Value = serde_json::from_str(&content)
            .map_err(|e| ToolError::Parse(format!("Invalid JSON: {}", e)))?;

        let mut analysis = json!({
            "path": path,
            "type": if data.is_array() { "array" } else { "object" },
            "size": content.chars().count(),
            "structure": structure(&data, 0),
        });

        match &data {
            Value::Array(items) => {
                analysis["array_length"] = json!(items.len());
                analysis["sample_item"] = items.first().cloned().unwrap_or(Value::Null);
            }
            Value::Object(map) => {
                analysis["keys"] = json!(map.keys().collect::<Vec<_>>());
                analysis["key_count"] = json!(map.len());
            }
            _ => {}
        }

        Ok(analysis)
    }
}

/// Shape summary: arrays as `Array[n]`, objects as their first keys mapped
/// to nested shapes, scalars as type names
fn structure(value: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return json!("...");
    }

    match value {
        Value::Array(items) => json!(format!("Array[{}]", items.len())),
        Value::Object(map) => {
            let shape: Map<String, Value> = map
                .iter()
                .take(MAX_KEYS_PER_LEVEL)
                .map(|(key, nested)| (key.clone(), structure(nested, depth + 1)))
                .collect();
            Value::Object(shape)
        }
        Value::String(_) => json!("string"),
        Value::Number(_) => json!("number"),
        Value::Bool(_) => json!("boolean"),
        Value::Null => json!("null"),
    }
}
