// Tool execution system
//
// Read-only inspection tools the model can call, each gated by the sandbox
// permission evaluator before it runs.

pub mod executor;
pub mod history;
pub mod implementations;
pub mod registry;
pub mod types;

pub use executor::{ToolEvent, ToolExecutor};
pub use history::{ExecutionHistory, ExecutionRecord, HISTORY_CAPACITY};
pub use registry::{Tool, ToolRegistry};
pub use types::{ParameterSpec, ToolArguments, ToolCall, ToolContext, ToolDefinition, ToolOutcome};
