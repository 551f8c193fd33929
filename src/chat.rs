//! Prompt-in, text-out chat against an LLM provider.
//!
//! Providers are built once per model and cached; handlers receive shared
//! `Arc` handles instead of constructing a client per request.
//!
//! ## Model selection
//!
//! A model string may name its provider explicitly as `provider:model`
//! (`"mistral:mistral-small-latest"`, `"openai:gpt-4.1-nano"`). A bare model
//! name uses `EDGEQUAKE_LLM_PROVIDER`, falling back to `openai`. With no model
//! at all the configured default is used, and without a default the provider
//! is auto-detected from the environment by [`ProviderFactory::from_env`].

use crate::error::PdfCacheError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const AUTO_KEY: &str = "auto";
const FALLBACK_PROVIDER: &str = "openai";

/// Cache of LLM providers keyed by model string.
pub struct LlmClients {
    default_model: Option<String>,
    providers: RwLock<HashMap<String, Arc<dyn LLMProvider>>>,
}

impl LlmClients {
    pub fn new(default_model: Option<String>) -> Self {
        Self {
            default_model: default_model.filter(|m| !m.trim().is_empty()),
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a pre-built provider under `model`. Requests naming that
    /// model (or, for `"auto"`, naming none) use it as-is.
    pub async fn insert(&self, model: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.providers.write().await.insert(model.into(), provider);
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    /// Resolve (and cache) the provider for `model`.
    pub async fn provider(&self, model: Option<&str>) -> Result<Arc<dyn LLMProvider>, PdfCacheError> {
        let key = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or(self.default_model.as_deref())
            .unwrap_or(AUTO_KEY)
            .to_string();

        if let Some(p) = self.providers.read().await.get(&key) {
            return Ok(Arc::clone(p));
        }

        let mut providers = self.providers.write().await;
        // Another request may have built it while we waited for the lock.
        if let Some(p) = providers.get(&key) {
            return Ok(Arc::clone(p));
        }
        let provider = build_provider(&key)?;
        info!("LLM provider ready for model '{}'", key);
        providers.insert(key, Arc::clone(&provider));
        Ok(provider)
    }

    /// Send `prompt` as a single user message and return the reply text.
    pub async fn chat(&self, prompt: &str, model: Option<&str>) -> Result<String, PdfCacheError> {
        if prompt.trim().is_empty() {
            return Err(PdfCacheError::InvalidInput("prompt must not be empty".into()));
        }
        let provider = self.provider(model).await?;
        let messages = vec![ChatMessage::user(prompt)];
        let options = CompletionOptions::default();

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Chat reply: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => {
                error!("Error communicating with LLM: {}", e);
                Err(PdfCacheError::LlmApiError {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Split `provider:model`; a bare model takes the provider from the environment.
fn split_model(spec: &str) -> (String, String) {
    match spec.split_once(':') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            (provider.to_string(), model.to_string())
        }
        _ => {
            let provider = std::env::var("EDGEQUAKE_LLM_PROVIDER")
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| FALLBACK_PROVIDER.to_string());
            (provider, spec.to_string())
        }
    }
}

fn build_provider(key: &str) -> Result<Arc<dyn LLMProvider>, PdfCacheError> {
    if key == AUTO_KEY {
        let (llm, _embedding) =
            ProviderFactory::from_env().map_err(|e| PdfCacheError::ProviderNotConfigured {
                provider: AUTO_KEY.to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, MISTRAL_API_KEY, or PDF2IMG_CHAT_MODEL.\n\
                    Error: {}",
                    e
                ),
            })?;
        return Ok(llm);
    }

    let (provider, model) = split_model(key);
    ProviderFactory::create_llm_provider(&provider, &model).map_err(|e| {
        PdfCacheError::ProviderNotConfigured {
            provider,
            hint: format!("{e}"),
        }
    })
}
