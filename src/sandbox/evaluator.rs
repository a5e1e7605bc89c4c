// Permission evaluation for tool calls
//
// Classifies an operation, then applies the layered path policy:
// missing path → blacklist → whitelist → sensitive name → blocked extension.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use super::path::{is_within, PathResolver};
use super::policy::PolicyConfig;

/// Argument keys that carry the target path, in lookup order
const PATH_KEYS: &[&str] = &["path", "directory", "working_dir"];

/// What kind of effect an operation has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Read,
    Write,
    SystemInfo,
    Execution,
}

impl OperationClass {
    /// Classify a tool name; unknown names have no class
    pub fn of(tool: &str) -> Option<Self> {
        match tool {
            "read_file" | "list_directory" | "search_files" | "get_file_info" | "analyze_json"
            | "analyze_csv" | "analyze_logs" | "get_disk_usage" => Some(Self::Read),
            "write_file" | "append_to_file" | "create_directory" | "delete_file"
            | "rename_file" | "transform_data" => Some(Self::Write),
            "list_processes" | "get_system_info" => Some(Self::SystemInfo),
            "execute_code" => Some(Self::Execution),
            _ => None,
        }
    }
}

/// Allow/deny verdict for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PermissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Reason text, empty for allowed decisions
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// Read-only view of the current roots, for display
#[derive(Debug, Clone, Serialize)]
pub struct PolicySnapshot {
    pub allowed_directories: Vec<String>,
    pub blocked_directories: Vec<String>,
}

/// Renders permission decisions against a shared, runtime-mutable policy
///
/// The policy is read by every evaluation and only written by the explicit
/// allowed-directory administration calls between requests.
pub struct PermissionEvaluator {
    policy: RwLock<PolicyConfig>,
    resolver: PathResolver,
}

impl PermissionEvaluator {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            resolver: policy.resolver().clone(),
            policy: RwLock::new(policy),
        }
    }

    /// Decide whether `tool` may run with `arguments`
    ///
    /// Never fails: internal problems become a deny carrying the failure text.
    pub fn evaluate(&self, tool: &str, arguments: &Map<String, Value>) -> PermissionDecision {
        let policy = match self.read_policy() {
            Ok(policy) => policy,
            Err(reason) => {
                warn!("Permission evaluation failed: {}", reason);
                return PermissionDecision::deny(format!("Validation error: {}", reason));
            }
        };

        let decision = match OperationClass::of(tool) {
            Some(OperationClass::Read) => {
                evaluate_paths(&policy, arguments, PathMode::Read)
            }
            Some(OperationClass::Write) => {
                PermissionDecision::deny("Write operations are not supported")
            }
            Some(OperationClass::SystemInfo) => PermissionDecision::allow(),
            Some(OperationClass::Execution) => {
                evaluate_paths(&policy, arguments, PathMode::Execution)
            }
            None => PermissionDecision::deny(format!("Unknown operation: {}", tool)),
        };

        debug!(
            tool,
            allowed = decision.allowed,
            reason = decision.reason(),
            "Permission decision"
        );
        decision
    }

    /// Add a sandbox root at runtime
    pub fn add_allowed_directory(&self, dir: &str) {
        match self.policy.write() {
            Ok(mut policy) => policy.add_allowed_directory(dir),
            Err(e) => warn!("Cannot add allowed directory {}: {}", dir, e),
        }
    }

    /// Remove a sandbox root at runtime; returns whether it was present
    pub fn remove_allowed_directory(&self, dir: &str) -> bool {
        match self.policy.write() {
            Ok(mut policy) => policy.remove_allowed_directory(dir),
            Err(e) => {
                warn!("Cannot remove allowed directory {}: {}", dir, e);
                false
            }
        }
    }

    /// Current roots with `~` substituted for the home directory
    pub fn snapshot(&self) -> PolicySnapshot {
        match self.read_policy() {
            Ok(policy) => PolicySnapshot {
                allowed_directories: policy.allowed_for_display(),
                blocked_directories: policy.blocked_for_display(),
            },
            Err(_) => PolicySnapshot {
                allowed_directories: Vec::new(),
                blocked_directories: Vec::new(),
            },
        }
    }

    /// Resolver shared with handlers so they open exactly the evaluated path
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn read_policy(&self) -> Result<RwLockReadGuard<'_, PolicyConfig>, String> {
        self.policy.read().map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathMode {
    Read,
    Execution,
}

impl PathMode {
    fn blocked_reason(self, root: &str) -> String {
        match self {
            PathMode::Read => format!("Access to {} is blocked for security", root),
            PathMode::Execution => format!("Code execution in {} is blocked for security", root),
        }
    }

    fn outside_reason(self, roots: &str) -> String {
        match self {
            PathMode::Read => format!(
                "Access denied. Only these directories are allowed: {}",
                roots
            ),
            PathMode::Execution => format!(
                "Code execution denied. Only these directories are allowed: {}",
                roots
            ),
        }
    }
}

/// Every path-bearing argument present in the call
///
/// `None` entries are present but unusable (empty or not a string).
fn path_arguments(arguments: &Map<String, Value>) -> Vec<Option<&str>> {
    PATH_KEYS
        .iter()
        .filter_map(|key| arguments.get(*key))
        .map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .collect()
}

/// Evaluate all path arguments; the first denial wins
///
/// Checking every key keeps a handler from opening a different path than the
/// one that was approved.
fn evaluate_paths(
    policy: &PolicyConfig,
    arguments: &Map<String, Value>,
    mode: PathMode,
) -> PermissionDecision {
    let paths = path_arguments(arguments);
    if paths.is_empty() {
        return evaluate_path(policy, None, mode);
    }
    for input in paths {
        let Some(input) = input else {
            return PermissionDecision::deny("No path specified");
        };
        let decision = evaluate_path(policy, Some(input), mode);
        if !decision.allowed {
            return decision;
        }
    }
    PermissionDecision::allow()
}

fn evaluate_path(policy: &PolicyConfig, input: Option<&str>, mode: PathMode) -> PermissionDecision {
    let resolved = match (input, mode) {
        (Some(input), _) => policy.resolver().resolve(input),
        (None, PathMode::Read) => return PermissionDecision::deny("No path specified"),
        (None, PathMode::Execution) => match policy.default_root() {
            Some(root) => root.to_path_buf(),
            None => return PermissionDecision::deny("No path specified"),
        },
    };

    if let Some(blocked) = policy
        .blocked_directories()
        .iter()
        .find(|root| is_within(&resolved, root))
    {
        return PermissionDecision::deny(mode.blocked_reason(&blocked.display().to_string()));
    }

    let in_whitelist = policy
        .allowed_directories()
        .iter()
        .any(|root| is_within(&resolved, root));
    if !in_whitelist {
        let roots = policy.allowed_for_display().join(", ");
        return PermissionDecision::deny(mode.outside_reason(&roots));
    }

    let file_name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if policy
        .sensitive_file_patterns()
        .iter()
        .any(|pattern| pattern.is_match(&file_name))
    {
        return PermissionDecision::deny(format!(
            "File {} appears to contain sensitive data",
            file_name
        ));
    }

    if let Some(ext) = dotted_extension(&resolved) {
        if policy.blocked_extensions().iter().any(|b| *b == ext) {
            return PermissionDecision::deny(format!(
                "File type {} is not allowed for security",
                ext
            ));
        }
    }

    PermissionDecision::allow()
}

fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
