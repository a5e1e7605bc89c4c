// Integration test for permission-checked tool execution
//
// Tests the full flow: policy → evaluator → executor → handler → history

use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use warden::sandbox::policy::{DEFAULT_BLOCKED_EXTENSIONS, DEFAULT_SENSITIVE_PATTERNS};
use warden::sandbox::{PathResolver, PermissionEvaluator, PolicyConfig};
use warden::tools::{ToolCall, ToolEvent, ToolExecutor, ToolRegistry};

/// Sandbox home with ~/Documents and ~/Desktop populated
///
/// Temp dirs live under /tmp (or /var on macOS), which the default policy
/// blocks, so the tests build their own policy around the temp home.
fn sandbox() -> (TempDir, ToolExecutor) {
    let home = tempfile::tempdir().unwrap();
    let docs = home.path().join("Documents");
    fs::create_dir_all(docs.join("reports")).unwrap();
    fs::create_dir_all(home.path().join("Desktop")).unwrap();
    fs::create_dir_all(home.path().join(".ssh")).unwrap();

    fs::write(docs.join("a.txt"), "first line\nsecond line").unwrap();
    fs::write(docs.join("reports/q1.json"), r#"{"revenue": 10, "items": [1, 2]}"#).unwrap();
    fs::write(docs.join("reports/q1.csv"), "name,total\n\"North\",10\n\"South\",20\n").unwrap();
    fs::write(
        docs.join("app.log"),
        "INFO start\nERROR disk full\nWARN slow io\nerror retry failed\n",
    )
    .unwrap();
    fs::write(docs.join(".env"), "TOKEN=x").unwrap();
    fs::write(docs.join("install.sh"), "echo hi").unwrap();
    fs::write(home.path().join(".ssh/id_rsa"), "key").unwrap();

    let executor = executor_for(home.path());
    (home, executor)
}

fn executor_for(home: &Path) -> ToolExecutor {
    let policy = PolicyConfig::new(PathResolver::new(home))
        .allow("~/Documents")
        .allow("~/Desktop")
        .block("/etc")
        .block("~/.ssh")
        .with_sensitive_patterns(DEFAULT_SENSITIVE_PATTERNS)
        .unwrap()
        .with_blocked_extensions(DEFAULT_BLOCKED_EXTENSIONS);
    ToolExecutor::new(
        ToolRegistry::with_default_tools(),
        PermissionEvaluator::new(policy),
    )
}

#[tokio::test]
async fn test_read_file_in_documents() {
    let (_home, executor) = sandbox();

    let outcome = executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "~/Documents/a.txt"})))
        .await;

    assert!(outcome.success, "{}", outcome.error_message());
    let result = outcome.result.unwrap();
    assert_eq!(result["content"], "first line\nsecond line");
    assert_eq!(result["lines"], 2);
    assert_eq!(result["truncated"], false);
}

#[tokio::test]
async fn test_read_etc_passwd_denied() {
    let (_home, executor) = sandbox();

    let outcome = executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "/etc/passwd"})))
        .await;

    assert!(!outcome.success);
    assert!(outcome.error_message().starts_with("Permission denied: "));
    assert!(outcome.error_message().contains("/etc"));
}

#[tokio::test]
async fn test_traversal_out_of_documents_denied() {
    let (_home, executor) = sandbox();

    for path in ["~/Documents/../../../etc/passwd", "~/Documents/../.ssh/id_rsa", "~/Music/song.mp3"] {
        let outcome = executor
            .execute_tool_call(&ToolCall::new("read_file", json!({ "path": path })))
            .await;
        assert!(!outcome.success, "{} should be denied", path);
        assert!(outcome.error_message().starts_with("Permission denied"));
    }
}

#[tokio::test]
async fn test_sensitive_and_executable_files_denied() {
    let (_home, executor) = sandbox();

    let env = executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "~/Documents/.env"})))
        .await;
    assert!(env.error_message().contains("sensitive data"));

    let script = executor
        .execute_tool_call(&ToolCall::new("get_file_info", json!({"path": "~/Documents/install.sh"})))
        .await;
    assert!(script.error_message().contains("File type .sh is not allowed"));
}

#[tokio::test]
async fn test_write_tool_denied_without_events() {
    let (_home, executor) = sandbox();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let executor = executor.with_events(tx);

    let outcome = executor
        .execute_tool_call(&ToolCall::new(
            "write_file",
            json!({"path": "~/Documents/new.txt", "content": "x"}),
        ))
        .await;

    // write_file is not in the catalog at all
    assert_eq!(outcome.error_message(), "Unknown tool: write_file");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_list_and_search_documents() {
    let (_home, executor) = sandbox();

    let listing = executor
        .execute_tool_call(&ToolCall::new("list_directory", json!({"path": "~/Documents"})))
        .await;
    assert!(listing.success, "{}", listing.error_message());
    let listing = listing.result.unwrap();
    let dirs: Vec<_> = listing["directories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dirs, vec!["reports"]);

    let search = executor
        .execute_tool_call(&ToolCall::new(
            "search_files",
            json!({"pattern": "*.json", "directory": "~/Documents"}),
        ))
        .await;
    assert!(search.success, "{}", search.error_message());
    assert_eq!(search.result.unwrap()["count"], 1);

    // Every path argument is checked
    let escaped = executor
        .execute_tool_call(&ToolCall::new(
            "search_files",
            json!({"pattern": "*", "directory": "~/.ssh"}),
        ))
        .await;
    assert!(escaped.error_message().starts_with("Permission denied"));
}

#[tokio::test]
async fn test_analyzers() {
    let (_home, executor) = sandbox();

    let logs = executor
        .execute_tool_call(&ToolCall::new(
            "analyze_logs",
            json!({"path": "~/Documents/app.log", "pattern": "retry"}),
        ))
        .await;
    assert!(logs.success, "{}", logs.error_message());
    let logs = logs.result.unwrap();
    assert_eq!(logs["summary"], "Found 2 errors, 1 warnings, 1 pattern matches");

    let json_report = executor
        .execute_tool_call(&ToolCall::new(
            "analyze_json",
            json!({"path": "~/Documents/reports/q1.json"}),
        ))
        .await;
    assert!(json_report.success, "{}", json_report.error_message());
    assert_eq!(json_report.result.unwrap()["type"], "object");

    let csv_report = executor
        .execute_tool_call(&ToolCall::new(
            "analyze_csv",
            json!({"path": "~/Documents/reports/q1.csv"}),
        ))
        .await;
    assert!(csv_report.success, "{}", csv_report.error_message());
    let csv_report = csv_report.result.unwrap();
    assert_eq!(csv_report["columns"], json!(["name", "total"]));
    assert_eq!(csv_report["total_rows"], 2);
    assert_eq!(csv_report["preview"][1]["name"], "South");
}

#[tokio::test]
async fn test_system_tools_need_no_path() {
    let (_home, executor) = sandbox();

    let info = executor
        .execute_tool_call(&ToolCall::new("get_system_info", json!({})))
        .await;
    assert!(info.success, "{}", info.error_message());
    assert!(info.result.unwrap()["cpu_count"].is_u64());
}

#[tokio::test]
async fn test_missing_file_is_handler_failure() {
    let (_home, executor) = sandbox();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let executor = executor.with_events(tx);

    let outcome = executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "~/Documents/missing.txt"})))
        .await;

    assert!(!outcome.success);
    assert!(matches!(rx.try_recv(), Ok(ToolEvent::Started { .. })));
    assert!(matches!(rx.try_recv(), Ok(ToolEvent::Failed { .. })));
}

#[tokio::test]
async fn test_history_records_every_attempt() {
    let (_home, executor) = sandbox();

    executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "~/Documents/a.txt"})))
        .await;
    executor
        .execute_tool_call(&ToolCall::new("read_file", json!({"path": "/etc/passwd"})))
        .await;
    executor
        .execute_tool_call(&ToolCall::new("no_such_tool", json!({})))
        .await;

    let history = executor.get_history(10);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].tool, "no_such_tool");
    assert!(!history[1].success);
    assert!(history[2].success);
    assert_eq!(executor.get_history(2).len(), 2);
}
