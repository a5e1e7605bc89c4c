// Warden - sandboxed tool calling for local language models
// Library exports

pub mod agent; // Multi-turn tool-calling loop
pub mod config;
pub mod errors;
pub mod providers; // Generation engines
pub mod sandbox; // Permission policy and evaluation
pub mod tools; // Tool catalog and execution
