// Warden - sandboxed tool calling for local language models
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::Arc;
use tokio::sync::mpsc;

use warden::agent::{AgentOrchestrator, AgentStatus};
use warden::config::{load_config, Config};
use warden::errors::{engine_unreachable_error, permission_denied_error, AgentError};
use warden::providers::create_engine;
use warden::sandbox::PermissionEvaluator;
use warden::tools::{ToolCall, ToolEvent, ToolExecutor, ToolRegistry};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Sandboxed read-only tool calling for local language models", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Allow an extra directory for this run (repeatable)
    #[arg(long = "allow", global = true, value_name = "DIR")]
    allow: Vec<String>,
}

#[derive(Parser, Debug)]
enum Command {
    /// List the tool catalog
    Tools,
    /// Run one permission-checked tool call and print the outcome
    Exec {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Show the permission decision for a tool call without running it
    Check {
        tool: String,
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Show the allowed and blocked directories
    Policy,
    /// Ask the model; tool calls run inside the sandbox
    Ask {
        /// Prompt text (read from stdin when omitted and stdin is piped)
        prompt: Option<String>,
        /// Plain generation without tool calling
        #[arg(long = "no-tools")]
        no_tools: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = load_config()?;
    let executor = build_executor(&config, &args.allow)?;

    match args.command {
        Command::Tools => run_tools(&executor),
        Command::Exec { tool, arguments } => run_exec(&executor, tool, &arguments).await,
        Command::Check { tool, arguments } => run_check(&executor, &tool, &arguments),
        Command::Policy => run_policy(&executor),
        Command::Ask { prompt, no_tools } => {
            let prompt = read_prompt(prompt)?;
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(report_tool_events(rx));
            run_ask(&config, Arc::new(executor.with_events(tx)), &prompt, no_tools).await
        }
    }
}

fn init_tracing() {
    // Default: WARN, RUST_LOG overrides, WARDEN_DEBUG=1 turns on debug
    let env_filter = if std::env::var("WARDEN_DEBUG").is_ok_and(|v| v == "1") {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    // Logs go to stderr so stdout stays clean for tool output and answers
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}

fn build_executor(config: &Config, extra_allowed: &[String]) -> Result<ToolExecutor> {
    let policy = config
        .build_policy(extra_allowed)
        .context("Failed to build sandbox policy")?;
    Ok(ToolExecutor::new(
        ToolRegistry::with_default_tools(),
        PermissionEvaluator::new(policy),
    ))
}

fn parse_call(tool: String, arguments: &str) -> Result<ToolCall> {
    let value: Value = serde_json::from_str(arguments)
        .with_context(|| format!("Tool arguments are not valid JSON: {}", arguments))?;
    if !value.is_object() {
        anyhow::bail!("Tool arguments must be a JSON object");
    }
    Ok(ToolCall::new(tool, value))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_tools(executor: &ToolExecutor) -> Result<()> {
    for tool in executor.list_tools() {
        println!("\x1b[1m{}\x1b[0m - {}", tool.name, tool.description);
        for param in &tool.parameters {
            let optional = if param.optional { " (optional)" } else { "" };
            println!(
                "    {} ({}){}: {}",
                param.name, param.param_type, optional, param.description
            );
        }
    }
    Ok(())
}

async fn run_exec(executor: &ToolExecutor, tool: String, arguments: &str) -> Result<()> {
    let call = parse_call(tool, arguments)?;
    let outcome = executor.execute_tool_call(&call).await;
    print_json(&outcome)?;

    if !outcome.success {
        if outcome.error_message().starts_with("Permission denied") {
            eprintln!(
                "\n{}",
                permission_denied_error(outcome.error_message(), &executor.policy().allowed_directories)
            );
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_check(executor: &ToolExecutor, tool: &str, arguments: &str) -> Result<()> {
    let call = parse_call(tool.to_string(), arguments)?;
    let decision = executor.permissions().evaluate(&call.tool, &call.arguments);
    print_json(&decision)
}

fn run_policy(executor: &ToolExecutor) -> Result<()> {
    print_json(&executor.policy())
}

/// Show tool activity on stderr while the answer streams to stdout
async fn report_tool_events(mut rx: mpsc::UnboundedReceiver<ToolEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ToolEvent::Started { tool, arguments } => {
                eprintln!("\x1b[2m[tool] {} {}\x1b[0m", tool, Value::Object(arguments));
            }
            ToolEvent::Completed { tool, .. } => {
                eprintln!("\x1b[2m[tool] {} done\x1b[0m", tool);
            }
            ToolEvent::Failed { tool, error } => {
                eprintln!("\x1b[31m[tool] {} failed: {}\x1b[0m", tool, error);
            }
        }
    }
}

fn read_prompt(prompt: Option<String>) -> Result<String> {
    if let Some(prompt) = prompt {
        return Ok(prompt);
    }
    if io::stdin().is_terminal() {
        anyhow::bail!("No prompt given. Usage: warden ask \"<prompt>\" (or pipe it on stdin)");
    }

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read prompt from stdin")?;
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("Empty prompt on stdin");
    }
    Ok(input.to_string())
}

async fn run_ask(
    config: &Config,
    executor: Arc<ToolExecutor>,
    prompt: &str,
    no_tools: bool,
) -> Result<()> {
    let engine = create_engine(&config.engine)?;
    let orchestrator = Arc::new(AgentOrchestrator::new(
        engine,
        executor,
        config.agent_options(),
    ));
    if no_tools || !config.agent.enabled {
        orchestrator.disable_agent();
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        ctrlc::set_handler(move || orchestrator.stop_generation())
            .context("Failed to install Ctrl-C handler")?;
    }

    let result = orchestrator
        .run(prompt, |token| {
            print!("{}", token);
            let _ = io::stdout().flush();
        })
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            println!();
            if response_never_started(&e) {
                eprintln!("{}", engine_unreachable_error(&config.engine.base_url));
            }
            return Err(e.into());
        }
    };
    println!();

    match response.status {
        AgentStatus::Answered | AgentStatus::ToolFailed => {}
        AgentStatus::TurnLimitReached => {
            eprintln!("\x1b[33m(stopped after {} tool turns)\x1b[0m", response.turns);
        }
        AgentStatus::Cancelled => eprintln!("\x1b[33m(cancelled)\x1b[0m"),
    }
    tracing::info!(
        turns = response.turns,
        chunks = response.total_chunks,
        "Request finished"
    );
    Ok(())
}

fn response_never_started(error: &AgentError) -> bool {
    match error {
        AgentError::Generation(e) => e
            .chain()
            .any(|cause| cause.downcast_ref::<reqwest::Error>().is_some_and(|e| e.is_connect())),
        AgentError::Busy => false,
    }
}
