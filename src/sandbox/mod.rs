// Permission sandbox for tool calls
//
// Confines every tool effect to a small directory whitelist and blocks
// sensitive roots, file names and extensions.

pub mod evaluator;
pub mod path;
pub mod policy;

pub use evaluator::{OperationClass, PermissionDecision, PermissionEvaluator, PolicySnapshot};
pub use path::PathResolver;
pub use policy::PolicyConfig;
