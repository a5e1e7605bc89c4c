// Generation engine providers
//
// Concrete `GenerationEngine` implementations the CLI can drive.

use anyhow::Result;
use std::sync::Arc;

use crate::agent::engine::GenerationEngine;
use crate::config::EngineConfig;

pub mod openai;

pub use openai::OpenAiCompatibleEngine;

/// Create the engine described by the configuration
pub fn create_engine(config: &EngineConfig) -> Result<Arc<dyn GenerationEngine>> {
    let mut engine = OpenAiCompatibleEngine::new(&config.base_url, &config.model)?;
    if let Some(key) = &config.api_key {
        engine = engine.with_api_key(key.clone());
    }
    tracing::debug!(base_url = %engine.base_url(), model = %engine.model(), "Created engine");
    Ok(Arc::new(engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_engine_from_config() {
        let config = EngineConfig {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            api_key: None,
        };
        let engine = create_engine(&config).unwrap();
        assert_eq!(engine.name(), "openai-compatible");
    }
}
