// analyze_logs - scans a log file for errors, warnings and a custom pattern

use crate::errors::ToolError;
use crate::tools::implementations::check_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_arguments, ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const MAX_FILE_MB: u64 = 50;
const MAX_PER_BUCKET: usize = 50;
const MAX_LINE_CHARS: usize = 200;

static ERROR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)error|fatal|exception|fail").expect("Failed to compile error regex")
});

static WARNING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)warn|warning|caution").expect("Failed to compile warning regex")
});

pub struct AnalyzeLogsTool;

#[derive(Deserialize)]
struct Args {
    path: String,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogLine {
    line: usize,
    content: String,
}

#[derive(Debug, Default, Serialize)]
struct LogAnalysis {
    total_lines: usize,
    errors: Vec<LogLine>,
    warnings: Vec<LogLine>,
    matches: Vec<LogLine>,
}

#[async_trait]
impl Tool for AnalyzeLogsTool {
    fn name(&self) -> &str {
        "analyze_logs"
    }

    fn description(&self) -> &str {
        "Analyze log files for errors, warnings, and custom patterns"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required(
                "path",
                "string",
                "Log file path (e.g., ~/Documents/app.log). Use ~ for home directory.",
            ),
            ParameterSpec::optional("pattern", "string", "Custom regex pattern to search"),
        ]
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let args: Args = parse_arguments(arguments)?;
        let path = context.resolve(&args.path);

        let pattern = match args.pattern.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => Some(
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ToolError::InvalidArguments(format!("Invalid pattern: {}", e)))?,
            ),
            None => None,
        };

        check_file_size(&path, MAX_FILE_MB).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(format!("Failed to read {}", path.display()), e))?;
        let content = String::from_utf8_lossy(&bytes);

        let analysis = analyze(&content, pattern.as_ref());

        let mut summary = format!(
            "Found {} errors, {} warnings",
            analysis.errors.len(),
            analysis.warnings.len()
        );
        if pattern.is_some() {
            summary.push_str(&format!(", {} pattern matches", analysis.matches.len()));
        }

        Ok(json!({
            "file": path,
            "analysis": analysis,
            "summary": summary,
        }))
    }
}

fn analyze(content: &str, pattern: Option<&Regex>) -> LogAnalysis {
    let mut analysis = LogAnalysis::default();

    for (index, line) in content.split('\n').enumerate() {
        analysis.total_lines += 1;

        let buckets = [
            (ERROR_REGEX.is_match(line), &mut analysis.errors),
            (WARNING_REGEX.is_match(line), &mut analysis.warnings),
            (
                pattern.is_some_and(|p| p.is_match(line)),
                &mut analysis.matches,
            ),
        ];
        for (hit, bucket) in buckets {
            if hit && bucket.len() < MAX_PER_BUCKET {
                bucket.push(LogLine {
                    line: index + 1,
                    content: line.chars().take(MAX_LINE_CHARS).collect(),
                });
            }
        }
    }

    analysis
}
