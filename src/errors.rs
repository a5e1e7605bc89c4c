// Error types and user-friendly error messages
//
// Library code returns typed errors (tool failures, agent failures); the CLI
// turns them into actionable messages that guide users toward solutions.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single tool invocation
///
/// Every variant is local to one call. The executor converts these into a
/// structured `ToolOutcome` and never lets them escape to the caller.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("File too large ({:.2}MB). Maximum: {limit_mb}MB", megabytes(.size))]
    SizeLimitExceeded { size: u64, limit_mb: u64 },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Subprocess(String),

    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: String,
        timeout: Duration,
    },
}

impl ToolError {
    /// Wrap an I/O error with a short description of what was attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            source,
        }
    }
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

/// Failure of an agent request as a whole
#[derive(Error, Debug)]
pub enum AgentError {
    /// Another generation is in flight for this session
    #[error("Already generating: wait for the current response to finish")]
    Busy,

    /// The generation engine failed to start or broke mid-stream
    #[error("Generation failed: {0:#}")]
    Generation(anyhow::Error),
}

impl AgentError {
    pub fn is_busy(&self) -> bool {
        matches!(self, AgentError::Busy)
    }
}

/// Format a permission denial with the directories that are reachable
pub fn permission_denied_error(reason: &str, allowed_roots: &[String]) -> String {
    let roots = if allowed_roots.is_empty() {
        "(none)".to_string()
    } else {
        allowed_roots.join(", ")
    };
    format!(
        "{}\n\n\
        \x1b[1;33mAllowed directories:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Use a path under one of the allowed directories (use ~ for home)\n\n\
        2. Allow another directory for this run:\n\
           \x1b[36mwarden --allow ~/Projects ...\x1b[0m\n\n\
        3. Add it permanently in the config file:\n\
           \x1b[36m~/.warden/config.toml\x1b[0m  ([policy] allowed_directories)",
        reason, roots
    )
}

/// Format an unreachable generation server error with helpful suggestions
pub fn engine_unreachable_error(base_url: &str) -> String {
    format!(
        "Could not reach the generation server at {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • The local model server is not running\n\
        • Wrong base URL in config\n\
        • The server does not expose an OpenAI-compatible API\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Start a local server, for example:\n\
           \x1b[36mllama-server -m model.gguf --port 8080\x1b[0m\n\n\
        2. Point warden at it:\n\
           \x1b[36mexport WARDEN_ENGINE_URL=http://127.0.0.1:8080\x1b[0m",
        base_url
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(error: &str) -> String {
    format!(
        "Failed to parse config file\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat ~/.warden/config.toml\x1b[0m\n\n\
        2. Common mistakes:\n\
           • Missing quotes around paths\n\
           • Unclosed brackets []\n\
           • Sensitive patterns that are not valid regular expressions",
        error
    )
}
