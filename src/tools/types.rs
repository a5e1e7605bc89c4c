// Core types for tool execution system
//
// Wire format shared with the model: {"tool": "<name>", "arguments": {...}}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::errors::ToolError;
use crate::sandbox::PathResolver;

/// String-keyed tool arguments
pub type ToolArguments = Map<String, Value>;

/// Context passed to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Resolver shared with the permission evaluator, so a handler opens the
    /// same path the policy approved
    pub resolver: PathResolver,
}

impl ToolContext {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolve(&self, input: &str) -> PathBuf {
        self.resolver.resolve(input)
    }
}

/// One entry of a tool's parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    pub description: String,
}

impl ParameterSpec {
    /// Required parameter
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            optional: false,
            description: description.to_string(),
        }
    }

    /// Optional parameter
    pub fn optional(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            optional: true,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Tool definition as shown to the model and to host callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Ordered parameter schema
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    /// JSON Schema rendering of the parameters
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if !param.optional {
                required.push(Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool call request, produced by the detector or a direct caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Build a call; non-object arguments become an empty map
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// Structured outcome of a tool call: `{success, result}` or `{success: false, error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Error text, empty on success
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

/// Deserialize the argument map into a handler's typed argument struct
pub fn parse_arguments<T: DeserializeOwned>(arguments: &ToolArguments) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
