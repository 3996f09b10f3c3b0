//! LLM integration.
//!
//! The classifier talks to an `LlmProvider`; the only production backend is
//! Gemini over REST, which supports forcing a JSON-only response.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub api_base: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = GeminiProvider::new(
        config.api_key.clone(),
        config.model.clone(),
        config.api_base.clone(),
    )?;
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(provider))
}
