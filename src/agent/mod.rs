// Agent loop - streamed generation with tool calling

pub mod detector;
pub mod engine;
pub mod orchestrator;
pub mod prompt;

pub use detector::{detect_tool_call, StreamingToolCallDetector};
pub use engine::{ChatMessage, GenerationEngine, GenerationOptions, GenerationRequest, Role};
pub use orchestrator::{AgentOptions, AgentOrchestrator, AgentResponse, AgentStatus};
pub use prompt::ToolPromptFormatter;
