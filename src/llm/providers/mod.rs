//! Provider implementations.
//!
//! The `build_*` factories are called once at startup from the resolved
//! config. Secrets arrive as separate arguments because they are sourced from
//! env vars, never from TOML.

pub mod hf_inference;
pub mod openai_compatible;

use crate::config::Config;
use crate::llm::ProviderError;

pub use hf_inference::{HfGenerator, HfInferenceLoader};
pub use openai_compatible::OpenAiCompatibleProvider;

/// Build the primary tier, or `None` when `OPENAI_API_KEY` is not set.
pub fn build_primary(config: &Config) -> Result<Option<OpenAiCompatibleProvider>, ProviderError> {
    config
        .primary_api_key
        .clone()
        .map(|key| OpenAiCompatibleProvider::new(&config.primary, key))
        .transpose()
}

/// Build the (not yet loaded) fallback tier.
pub fn build_fallback(config: &Config) -> HfInferenceLoader {
    HfInferenceLoader::new(config.fallback.clone(), config.fallback_token.clone())
}
