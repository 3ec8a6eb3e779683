//! Backend resolution.
//!
//! From most to least specific:
//!
//! 1. `config.backend`: a ready [`SummaryBackend`], used as-is
//! 2. `config.provider`: a ready `LLMProvider`
//! 3. `config.provider_name` (+ `config.model`)
//! 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
//!    (the same pair the `summarize` binary reads)
//! 5. `OPENAI_API_KEY` → OpenAI
//! 6. [`ProviderFactory::from_env`] auto-detection

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::summarize::generate::{LlmBackend, SummaryBackend};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Provider override, honoured together with [`MODEL_ENV`].
pub const PROVIDER_ENV: &str = "EDGEQUAKE_LLM_PROVIDER";
/// Model override.
pub const MODEL_ENV: &str = "EDGEQUAKE_MODEL";

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SummaryError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SummaryError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn wrap(provider: Arc<dyn LLMProvider>, label: String) -> Arc<dyn SummaryBackend> {
    debug!("Using LLM backend {}", label);
    Arc::new(LlmBackend::new(provider, label))
}

/// Which provider the resolution chain settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChoice {
    /// `config.backend`, used as-is.
    Backend,
    /// `config.provider`, wrapped in an [`LlmBackend`].
    Provider,
    /// A provider created by name.
    Named { provider: String, model: String },
    /// [`ProviderFactory::from_env`] auto-detection.
    Auto,
}

/// Walk the resolution chain without creating anything.
///
/// `env` looks up an environment variable; empty values count as unset.
pub fn choose_provider<F>(config: &SummaryConfig, env: F) -> ProviderChoice
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).filter(|v| !v.is_empty());

    if config.backend.is_some() {
        return ProviderChoice::Backend;
    }
    if config.provider.is_some() {
        return ProviderChoice::Provider;
    }
    if let Some(ref name) = config.provider_name {
        return ProviderChoice::Named {
            provider: name.clone(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };
    }
    if let (Some(provider), Some(model)) = (var(PROVIDER_ENV), var(MODEL_ENV)) {
        return ProviderChoice::Named { provider, model };
    }
    if var("OPENAI_API_KEY").is_some() {
        return ProviderChoice::Named {
            provider: "openai".to_string(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };
    }
    ProviderChoice::Auto
}

/// Resolve the backend used for candidate generation.
pub fn resolve_backend(config: &SummaryConfig) -> Result<Arc<dyn SummaryBackend>, SummaryError> {
    match choose_provider(config, |key| std::env::var(key).ok()) {
        ProviderChoice::Backend => match config.backend {
            Some(ref backend) => Ok(Arc::clone(backend)),
            None => Err(SummaryError::Internal("backend vanished".to_string())),
        },
        ProviderChoice::Provider => match config.provider {
            Some(ref provider) => Ok(wrap(Arc::clone(provider), "custom".to_string())),
            None => Err(SummaryError::Internal("provider vanished".to_string())),
        },
        ProviderChoice::Named { provider, model } => {
            let label = format!("{provider}/{model}");
            Ok(wrap(create_provider(&provider, &model)?, label))
        }
        ProviderChoice::Auto => {
            let (llm_provider, _embedding) =
                ProviderFactory::from_env().map_err(|e| SummaryError::ProviderNotConfigured {
                    provider: "auto".to_string(),
                    hint: format!(
                        "No LLM provider could be auto-detected from environment.\n\
                        Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or {PROVIDER_ENV} + {MODEL_ENV}.\n\
                        Error: {}",
                        e
                    ),
                })?;
            Ok(wrap(llm_provider, "auto".to_string()))
        }
    }
}
