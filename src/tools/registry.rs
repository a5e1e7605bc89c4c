// Tool registry and trait definition
//
// Manages available tools and provides uniform execution interface

use crate::errors::ToolError;
use crate::tools::types::{ParameterSpec, ToolArguments, ToolContext, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Tool trait - all tools must implement this
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (e.g., "read_file", "list_directory")
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Ordered parameter schema
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Execute the tool with already permission-checked arguments
    async fn execute(&self, arguments: &ToolArguments, context: &ToolContext)
        -> Result<Value, ToolError>;

    /// Get full tool definition
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Registry of available tools
///
/// Keeps registration order so the catalog is rendered to the model the
/// same way every time.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with the full read-only inspection catalog
    pub fn with_default_tools() -> Self {
        use crate::tools::implementations::*;

        let mut registry = Self::new();
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(ListDirectoryTool));
        registry.register(Box::new(SearchFilesTool));
        registry.register(Box::new(FileInfoTool));
        registry.register(Box::new(DiskUsageTool));
        registry.register(Box::new(AnalyzeLogsTool));
        registry.register(Box::new(ListProcessesTool));
        registry.register(Box::new(SystemInfoTool));
        registry.register(Box::new(AnalyzeJsonTool));
        registry.register(Box::new(AnalyzeCsvTool));
        registry
    }

    /// Register a tool; a later registration under the same name replaces it
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|b| b.as_ref())
    }

    /// Check if tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Get all tool definitions in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition())
            .collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
