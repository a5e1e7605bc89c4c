// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{apply_overrides, config_path, load_config, load_config_from};
pub use settings::{AgentSettings, Config, EngineConfig, PolicySettings};
