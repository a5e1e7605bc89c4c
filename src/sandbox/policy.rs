// Sandbox policy: which roots tools may touch and which names they may not

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

use super::path::PathResolver;

/// Directories reachable by default, relative to home
pub const DEFAULT_ALLOWED: &[&str] = &["~/Documents", "~/Desktop", "~/Downloads"];

/// Roots that are never reachable, even when whitelisted
pub const DEFAULT_BLOCKED: &[&str] = &[
    "/System",
    "/private",
    "/Library",
    "/usr",
    "/bin",
    "/sbin",
    "/var",
    "/etc",
    "/tmp",
    "~/.ssh",
    "~/Library/Keychains",
    "~/.aws",
    "~/.config",
];

/// File name patterns that look like credentials, keys or wallets
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    r"\.env$",
    r"\.env\.",
    r"(?i)credentials",
    r"(?i)password",
    r"id_rsa",
    r"id_dsa",
    r"\.key$",
    r"\.pem$",
    r"\.p12$",
    r"\.pfx$",
    r"wallet\.dat$",
    r"(?i)keystore",
];

/// Executable, bundle and script extensions
pub const DEFAULT_BLOCKED_EXTENSIONS: &[&str] = &[".app", ".dmg", ".pkg", ".sh", ".command"];

/// Layered access policy evaluated for every path-bearing tool call
///
/// Roots are stored resolved and normalized. Lists keep insertion order so
/// denial reasons are deterministic; duplicates are never inserted.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    resolver: PathResolver,
    allowed_directories: Vec<PathBuf>,
    blocked_directories: Vec<PathBuf>,
    sensitive_file_patterns: Vec<Regex>,
    blocked_extensions: Vec<String>,
}

impl PolicyConfig {
    /// Empty policy: nothing allowed, nothing blocked, no patterns
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            allowed_directories: Vec::new(),
            blocked_directories: Vec::new(),
            sensitive_file_patterns: Vec::new(),
            blocked_extensions: Vec::new(),
        }
    }

    /// Default policy for the given home directory
    pub fn with_defaults(resolver: PathResolver) -> Self {
        let mut policy = Self::new(resolver);
        for dir in DEFAULT_ALLOWED {
            policy.add_allowed_directory(dir);
        }
        for dir in DEFAULT_BLOCKED {
            policy.add_blocked_directory(dir);
        }
        policy.sensitive_file_patterns = DEFAULT_SENSITIVE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        policy.blocked_extensions = DEFAULT_BLOCKED_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .collect();
        policy
    }

    /// Builder-style allow, used by config loading and tests
    pub fn allow(mut self, dir: &str) -> Self {
        self.add_allowed_directory(dir);
        self
    }

    /// Builder-style block
    pub fn block(mut self, dir: &str) -> Self {
        self.add_blocked_directory(dir);
        self
    }

    /// Replace the sensitive filename patterns
    pub fn with_sensitive_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.sensitive_file_patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .with_context(|| format!("Invalid sensitive file pattern: {}", p.as_ref()))
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Replace the blocked extensions (leading dot optional, case-insensitive)
    pub fn with_blocked_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.blocked_extensions = extensions
            .iter()
            .map(|e| {
                let e = e.as_ref().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();
        self
    }

    /// Add a directory to the whitelist (idempotent)
    pub fn add_allowed_directory(&mut self, dir: &str) {
        let resolved = self.resolver.resolve(dir);
        if !self.allowed_directories.contains(&resolved) {
            self.allowed_directories.push(resolved);
        }
    }

    /// Remove a directory from the whitelist; returns whether it was present
    pub fn remove_allowed_directory(&mut self, dir: &str) -> bool {
        let resolved = self.resolver.resolve(dir);
        let before = self.allowed_directories.len();
        self.allowed_directories.retain(|d| d != &resolved);
        self.allowed_directories.len() != before
    }

    /// Add a directory to the blacklist (idempotent)
    pub fn add_blocked_directory(&mut self, dir: &str) {
        let resolved = self.resolver.resolve(dir);
        if !self.blocked_directories.contains(&resolved) {
            self.blocked_directories.push(resolved);
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn allowed_directories(&self) -> &[PathBuf] {
        &self.allowed_directories
    }

    pub fn blocked_directories(&self) -> &[PathBuf] {
        &self.blocked_directories
    }

    pub fn sensitive_file_patterns(&self) -> &[Regex] {
        &self.sensitive_file_patterns
    }

    pub fn blocked_extensions(&self) -> &[String] {
        &self.blocked_extensions
    }

    /// Allowed roots rendered with `~` for readability
    pub fn allowed_for_display(&self) -> Vec<String> {
        self.allowed_directories
            .iter()
            .map(|d| self.resolver.display(d))
            .collect()
    }

    /// Blocked roots rendered with `~` for readability
    pub fn blocked_for_display(&self) -> Vec<String> {
        self.blocked_directories
            .iter()
            .map(|d| self.resolver.display(d))
            .collect()
    }

    /// First allowed root, used as the implicit root for path-less execution
    pub fn default_root(&self) -> Option<&Path> {
        self.allowed_directories.first().map(|p| p.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> PathResolver {
        PathResolver::new("/home/tester")
    }

    #[test]
    fn test_defaults_are_resolved_against_home() {
        let policy = PolicyConfig::with_defaults(home());
        assert!(policy
            .allowed_directories()
            .contains(&PathBuf::from("/home/tester/Documents")));
        assert!(policy
            .blocked_directories()
            .contains(&PathBuf::from("/home/tester/.ssh")));
        assert!(policy.blocked_directories().contains(&PathBuf::from("/etc")));
        assert_eq!(
            policy.sensitive_file_patterns().len(),
            DEFAULT_SENSITIVE_PATTERNS.len()
        );
    }

    #[test]
    fn test_add_allowed_is_idempotent() {
        let mut policy = PolicyConfig::new(home());
        policy.add_allowed_directory("~/Projects");
        policy.add_allowed_directory("/home/tester/Projects");
        policy.add_allowed_directory("Projects/");
        assert_eq!(policy.allowed_directories().len(), 1);
    }

    #[test]
    fn test_remove_allowed() {
        let mut policy = PolicyConfig::with_defaults(home());
        assert!(policy.remove_allowed_directory("~/Downloads"));
        assert!(!policy.remove_allowed_directory("~/Downloads"));
        assert_eq!(policy.allowed_for_display(), vec!["~/Documents", "~/Desktop"]);
    }

    #[test]
    fn test_invalid_sensitive_pattern_rejected() {
        let result = PolicyConfig::new(home()).with_sensitive_patterns(&["(unclosed"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_blocked_extensions_normalized() {
        let policy = PolicyConfig::new(home()).with_blocked_extensions(&["EXE", ".Sh"]);
        assert_eq!(policy.blocked_extensions(), &[".exe".to_string(), ".sh".to_string()]);
    }
}
