// Tool prompt formatting for local models
//
// Formats tool definitions into the model's system prompt and tool results
// into the prompt for the following turn.

use crate::tools::types::ToolDefinition;
use serde_json::Value;

/// Formats tool definitions and results for local model prompts
pub struct ToolPromptFormatter;

impl ToolPromptFormatter {
    /// Format tool definitions into system prompt text
    ///
    /// Covers the JSON call format, usage rules, path rules for the current
    /// sandbox roots, and one section per tool. Empty when there are no tools.
    pub fn format_tools_for_prompt(tools: &[ToolDefinition], allowed_roots: &[String]) -> String {
        if tools.is_empty() {
            return String::new();
        }

        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You have access to the following tools to help answer user queries. ");
        prompt.push_str("To use a tool, respond with a JSON object in this exact format:\n");
        prompt.push_str("```json\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"tool\": \"tool_name\",\n");
        prompt.push_str("  \"arguments\": {\n");
        prompt.push_str("    \"param1\": \"value1\",\n");
        prompt.push_str("    \"param2\": \"value2\"\n");
        prompt.push_str("  }\n");
        prompt.push_str("}\n");
        prompt.push_str("```\n\n");

        prompt.push_str("**IMPORTANT RULES:**\n");
        prompt.push_str("1. Use tools when you need to access files, analyze data, or get system information\n");
        prompt.push_str("2. Always use the exact JSON format above\n");
        prompt.push_str("3. Only use one tool at a time\n");
        prompt.push_str("4. Wait for the tool result before responding to the user\n");
        prompt.push_str("5. After receiving tool results, provide a natural language response to the user\n\n");

        if !allowed_roots.is_empty() {
            let roots = allowed_roots.join(", ");
            prompt.push_str("**PATH RULES:**\n");
            prompt.push_str("- ALWAYS use ~ (tilde) for paths in the user's home directory\n");
            prompt.push_str(&format!("- Allowed directories: {}\n", roots));
            prompt.push_str(&format!(
                "- Example: \"Documents folder\" means path \"{}\"\n",
                allowed_roots[0]
            ));
            prompt.push_str("- Paths outside the allowed directories will be refused\n\n");
        }

        for tool in tools {
            prompt.push_str(&format!("### {}\n{}\n", tool.name, tool.description));
            if tool.parameters.is_empty() {
                prompt.push_str("Parameters: none\n\n");
                continue;
            }
            prompt.push_str("Parameters:\n");
            for param in &tool.parameters {
                let optional = if param.optional { " (optional)" } else { "" };
                prompt.push_str(&format!(
                    "  - {} ({}){}: {}\n",
                    param.name, param.param_type, optional, param.description
                ));
            }
            prompt.push('\n');
        }

        if !allowed_roots.is_empty() {
            prompt.push_str(&format!(
                "Remember: ALWAYS use {} for paths!\n",
                allowed_roots.join(", ")
            ));
        }

        prompt
    }

    /// Full system prompt: the caller's prompt followed by the tool section
    pub fn build_system_prompt(
        user_system_prompt: &str,
        tools: &[ToolDefinition],
        allowed_roots: &[String],
    ) -> String {
        let tools_section = Self::format_tools_for_prompt(tools, allowed_roots);
        match (user_system_prompt.trim().is_empty(), tools_section.is_empty()) {
            (_, true) => user_system_prompt.to_string(),
            (true, false) => tools_section,
            (false, false) => format!("{}\n\n{}", user_system_prompt, tools_section),
        }
    }

    /// Prompt for the turn after a successful tool call
    pub fn format_tool_result(tool: &str, result: &Value) -> String {
        let rendered = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
        format!(
            "Tool {} returned:\n```json\n{}\n```\n\nNow provide a helpful response to the user based on this information.",
            tool, rendered
        )
    }

    /// Text shown to the user when a tool call fails
    pub fn format_tool_failure(error: &str) -> String {
        format!("\n\nTool execution failed: {}\n", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ParameterSpec;
    use serde_json::json;

    fn roots() -> Vec<String> {
        vec!["~/Documents".to_string(), "~/Desktop".to_string()]
    }

    fn read_file_definition() -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read the contents of a text file".to_string(),
            parameters: vec![ParameterSpec::required("path", "string", "File path to read")],
        }
    }

    #[test]
    fn test_format_empty_tools() {
        assert_eq!(ToolPromptFormatter::format_tools_for_prompt(&[], &roots()), "");
        assert_eq!(
            ToolPromptFormatter::build_system_prompt("Be brief.", &[], &roots()),
            "Be brief."
        );
    }

    #[test]
    fn test_format_single_tool() {
        let result =
            ToolPromptFormatter::format_tools_for_prompt(&[read_file_definition()], &roots());

        assert!(result.contains("## Available Tools"));
        assert!(result.contains("### read_file"));
        assert!(result.contains("Read the contents of a text file"));
        assert!(result.contains("  - path (string): File path to read"));
        assert!(result.contains("\"tool\": \"tool_name\""));
        assert!(result.contains("Allowed directories: ~/Documents, ~/Desktop"));
    }

    #[test]
    fn test_optional_and_empty_parameters() {
        let tools = vec![
            ToolDefinition {
                name: "analyze_logs".to_string(),
                description: "Analyze logs".to_string(),
                parameters: vec![
                    ParameterSpec::required("path", "string", "Log file"),
                    ParameterSpec::optional("pattern", "string", "Custom regex"),
                ],
            },
            ToolDefinition {
                name: "list_processes".to_string(),
                description: "List processes".to_string(),
                parameters: vec![],
            },
        ];
        let result = ToolPromptFormatter::format_tools_for_prompt(&tools, &roots());
        assert!(result.contains("  - pattern (string) (optional): Custom regex"));
        assert!(result.contains("### list_processes\nList processes\nParameters: none"));
    }

    #[test]
    fn test_system_prompt_prefix() {
        let prompt = ToolPromptFormatter::build_system_prompt(
            "You are helpful.",
            &[read_file_definition()],
            &roots(),
        );
        assert!(prompt.starts_with("You are helpful.\n\n## Available Tools"));
    }

    #[test]
    fn test_format_tool_result() {
        let prompt = ToolPromptFormatter::format_tool_result("read_file", &json!({"lines": 2}));
        assert_eq!(
            prompt,
            "Tool read_file returned:\n```json\n{\n  \"lines\": 2\n}\n```\n\nNow provide a helpful response to the user based on this information."
        );
    }

    #[test]
    fn test_format_tool_failure() {
        assert_eq!(
            ToolPromptFormatter::format_tool_failure("Permission denied: x"),
            "\n\nTool execution failed: Permission denied: x\n"
        );
    }
}
