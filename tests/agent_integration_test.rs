// End-to-end agent test against a mock OpenAI-compatible server
//
// Flow: prompt → streamed tool call → sandboxed read → follow-up prompt → answer

use mockito::Matcher;
use std::fs;
use std::sync::Arc;
use warden::agent::{AgentOptions, AgentOrchestrator, AgentStatus};
use warden::providers::OpenAiCompatibleEngine;
use warden::sandbox::{PathResolver, PermissionEvaluator, PolicyConfig};
use warden::tools::{ToolExecutor, ToolRegistry};

fn sse(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let event = serde_json::json!({"choices": [{"delta": {"content": chunk}}]});
        body.push_str(&format!("data: {}\n\n", event));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn executor(home: &std::path::Path) -> Arc<ToolExecutor> {
    let policy = PolicyConfig::new(PathResolver::new(home))
        .allow("~/Documents")
        .block("/etc");
    Arc::new(ToolExecutor::new(
        ToolRegistry::with_default_tools(),
        PermissionEvaluator::new(policy),
    ))
}

#[tokio::test]
async fn test_tool_round_trip_over_http() {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir(home.path().join("Documents")).unwrap();
    fs::write(home.path().join("Documents/a.txt"), "the launch code is 42").unwrap();

    let mut server = mockito::Server::new_async().await;
    // First turn: the question is the last message
    let first = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex(r#"a\.txt\?"\}\]"#.to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[
            "```json\n{\"tool\": \"read_file\", ",
            "\"arguments\": {\"path\": \"~/Documents/a.txt\"}}\n```",
        ]))
        .create_async()
        .await;
    // Second turn: the tool result prompt is the last message
    let second = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("Tool read_file returned".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&["The file says ", "the launch code is 42."]))
        .create_async()
        .await;

    let engine = Arc::new(OpenAiCompatibleEngine::new(server.url(), "local").unwrap());
    let orchestrator = AgentOrchestrator::new(engine, executor(home.path()), AgentOptions::default());

    let mut streamed = String::new();
    let response = orchestrator
        .run("What is in a.txt?", |token| streamed.push_str(token))
        .await
        .unwrap();

    assert_eq!(response.status, AgentStatus::Answered);
    assert_eq!(response.turns, 2);
    assert_eq!(response.text, "The file says the launch code is 42.");
    assert_eq!(streamed, response.text);
    assert!(!streamed.contains("read_file"));

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_denied_tool_call_over_http() {
    let home = tempfile::tempdir().unwrap();

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&["{\"tool\": \"read_file\", \"arguments\": {\"path\": \"/etc/shadow\"}}"]))
        .expect(1)
        .create_async()
        .await;

    let engine = Arc::new(OpenAiCompatibleEngine::new(server.url(), "local").unwrap());
    let orchestrator = AgentOrchestrator::new(engine, executor(home.path()), AgentOptions::default());

    let mut streamed = String::new();
    let response = orchestrator
        .run("show me /etc/shadow", |token| streamed.push_str(token))
        .await
        .unwrap();

    assert_eq!(response.status, AgentStatus::ToolFailed);
    assert_eq!(
        streamed,
        "\n\nTool execution failed: Permission denied: Access to /etc is blocked for security\n"
    );
    assert!(orchestrator.executor().get_history(1)[0].error.is_some());
}

#[tokio::test]
async fn test_unreachable_engine_is_generation_error() {
    let home = tempfile::tempdir().unwrap();
    // Nothing listens on port 9 locally
    let engine = Arc::new(OpenAiCompatibleEngine::new("http://127.0.0.1:9", "local").unwrap());
    let orchestrator = AgentOrchestrator::new(engine, executor(home.path()), AgentOptions::default());

    let err = orchestrator.run("hello", |_| {}).await.unwrap_err();
    assert!(!err.is_busy());
    assert!(!orchestrator.is_generating());
}
