// Configuration structs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::agent::engine::GenerationOptions;
use crate::agent::orchestrator::{AgentOptions, DEFAULT_MAX_TURNS, DEFAULT_SYSTEM_PROMPT};
use crate::providers::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::sandbox::policy::{
    DEFAULT_ALLOWED, DEFAULT_BLOCKED, DEFAULT_BLOCKED_EXTENSIONS, DEFAULT_SENSITIVE_PATTERNS,
};
use crate::sandbox::{PathResolver, PolicyConfig};

/// Top-level `~/.warden/config.toml`
///
/// Every table and key is optional; missing values take the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Home directory used for `~` expansion (defaults to the user's home)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    pub policy: PolicySettings,
    pub agent: AgentSettings,
    pub engine: EngineConfig,
}

/// `[policy]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub allowed_directories: Vec<String>,
    pub blocked_directories: Vec<String>,
    /// Regular expressions matched against file names
    pub sensitive_patterns: Vec<String>,
    pub blocked_extensions: Vec<String>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            allowed_directories: to_strings(DEFAULT_ALLOWED),
            blocked_directories: to_strings(DEFAULT_BLOCKED),
            sensitive_patterns: to_strings(DEFAULT_SENSITIVE_PATTERNS),
            blocked_extensions: to_strings(DEFAULT_BLOCKED_EXTENSIONS),
        }
    }
}

/// `[agent]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Tool calling on or off
    pub enabled: bool,
    pub max_turns: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let generation = GenerationOptions::default();
        Self {
            enabled: true,
            max_turns: DEFAULT_MAX_TURNS,
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// `[engine]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Resolver for `~` expansion
    pub fn resolver(&self) -> Result<PathResolver> {
        match &self.home {
            Some(home) => Ok(PathResolver::new(home)),
            None => PathResolver::for_current_user().context("Could not determine home directory"),
        }
    }

    /// Build the sandbox policy, with `extra_allowed` appended to the whitelist
    pub fn build_policy(&self, extra_allowed: &[String]) -> Result<PolicyConfig> {
        let mut policy = PolicyConfig::new(self.resolver()?)
            .with_sensitive_patterns(self.policy.sensitive_patterns.as_slice())?
            .with_blocked_extensions(self.policy.blocked_extensions.as_slice());

        for dir in &self.policy.blocked_directories {
            policy.add_blocked_directory(dir);
        }
        for dir in self.policy.allowed_directories.iter().chain(extra_allowed) {
            policy.add_allowed_directory(dir);
        }
        Ok(policy)
    }

    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            max_turns: self.agent.max_turns.max(1),
            generation: GenerationOptions {
                temperature: self.agent.temperature,
                max_tokens: self.agent.max_tokens,
            },
            system_prompt: self.agent.system_prompt.clone(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sandbox_defaults() {
        let config = Config {
            home: Some(PathBuf::from("/home/tester")),
            ..Config::default()
        };
        let policy = config.build_policy(&[]).unwrap();
        let defaults = PolicyConfig::with_defaults(PathResolver::new("/home/tester"));

        assert_eq!(policy.allowed_directories(), defaults.allowed_directories());
        assert_eq!(policy.blocked_directories(), defaults.blocked_directories());
        assert_eq!(policy.blocked_extensions(), defaults.blocked_extensions());
        assert_eq!(
            policy.sensitive_file_patterns().len(),
            DEFAULT_SENSITIVE_PATTERNS.len()
        );
    }

    #[test]
    fn test_extra_allowed_directories() {
        let config = Config {
            home: Some(PathBuf::from("/home/tester")),
            ..Config::default()
        };
        let policy = config.build_policy(&["~/Projects".to_string()]).unwrap();
        assert!(policy
            .allowed_directories()
            .contains(&PathBuf::from("/home/tester/Projects")));
    }

    #[test]
    fn test_invalid_sensitive_pattern() {
        let mut config = Config {
            home: Some(PathBuf::from("/home/tester")),
            ..Config::default()
        };
        config.policy.sensitive_patterns = vec!["(unclosed".to_string()];
        let err = config.build_policy(&[]).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_agent_options() {
        let mut config = Config::default();
        config.agent.max_turns = 0;
        config.agent.max_tokens = 512;

        let options = config.agent_options();
        assert_eq!(options.max_turns, 1);
        assert_eq!(options.generation.max_tokens, 512);
        assert_eq!(options.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }
}
