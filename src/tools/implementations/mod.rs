// Tool implementations
//
// The read-only inspection catalog, plus small helpers shared by handlers.

use crate::errors::ToolError;
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

// File content tools
pub mod analyze_csv;
pub mod analyze_json;
pub mod analyze_logs;
pub mod read_file;

// Filesystem layout tools
pub mod disk_usage;
pub mod file_info;
pub mod list_directory;
pub mod search_files;

// System tools
pub mod list_processes;
pub mod system_info;

// Re-exports for convenience
pub use analyze_csv::AnalyzeCsvTool;
pub use analyze_json::AnalyzeJsonTool;
pub use analyze_logs::AnalyzeLogsTool;
pub use disk_usage::DiskUsageTool;
pub use file_info::FileInfoTool;
pub use list_directory::ListDirectoryTool;
pub use list_processes::ListProcessesTool;
pub use read_file::ReadFileTool;
pub use search_files::SearchFilesTool;
pub use system_info::SystemInfoTool;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Stat `path` and reject it when larger than `max_mb` megabytes
pub async fn check_file_size(path: &Path, max_mb: u64) -> Result<Metadata, ToolError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ToolError::io(format!("Cannot access {}", path.display()), e))?;

    if metadata.len() > max_mb * BYTES_PER_MB {
        return Err(ToolError::SizeLimitExceeded {
            size: metadata.len(),
            limit_mb: max_mb,
        });
    }
    Ok(metadata)
}

/// Human-readable size: "0 B", "512 B", "1.5 KB", "2 GB"
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}

/// RFC 3339 rendering of a filesystem timestamp
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

/// Optional filesystem timestamp (creation time is not reported everywhere)
pub fn format_optional_time(time: std::io::Result<SystemTime>) -> Option<String> {
    time.ok().map(format_time)
}
