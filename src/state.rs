//! Application state: the configured generation pipeline.
//!
//! The provider is chosen once here, at process construction, from the
//! LLM_PROVIDER environment (Ollama by default, OpenRouter when configured).
//! Handlers share one stateless `Generator`; no locking is needed.

use tracing::{info, instrument, warn};

use crate::config::load_config_from_env;
use crate::generate::Generator;
use crate::llm::provider_from_env;

pub struct AppState {
  pub generator: Generator,
}

impl AppState {
  /// Build state from env: load prompt overrides, select the provider,
  /// assemble the generator. Fails only when no provider can be built.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Result<Self, String> {
    let prompts = match load_config_from_env() {
      Some(cfg) => cfg.prompts,
      None => {
        warn!(target: "studygen_backend", "No prompts config loaded; using built-in templates");
        Default::default()
      }
    };

    let provider = provider_from_env()
      .ok_or_else(|| "no completion provider available (check LLM_PROVIDER and its credentials)".to_string())?;
    info!(target: "studygen_backend", provider = provider.name(), "Completion provider selected");

    Ok(Self { generator: Generator::new(provider, prompts) })
  }
}
