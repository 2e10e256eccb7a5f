//! Provider resolver: picks exactly one (provider, model, client) per request.
//!
//! # Precedence
//! 1. Explicit provider (with the explicit model verbatim, or its default model)
//! 2. Explicit model only: the provider inferred from the model name
//! 3. Preferred provider from the preferences file, if its key is set
//! 4. `AI_DEFAULT_PROVIDER`, if its key is set
//! 5. First provider in [`PROVIDERS`](crate::registry::PROVIDERS) order with a key
//!
//! When a model is given but its provider cannot be inferred, steps 3–5 pick
//! the provider and the model string is passed through unchanged.

use std::sync::Arc;

use tracing::{debug, warn};

use aiwand_core::config::{PreferenceStore, Preferences};
use aiwand_core::{AiError, Provider, Result};

use crate::cache::ClientCache;
use crate::env::{EnvLookup, ProcessEnv, DEFAULT_PROVIDER_ENV};
use crate::registry::{self, PROVIDERS};
use crate::traits::LlmClient;

/// A provider and a model to request from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub provider: Provider,
    pub model: String,
}

/// A selection plus the client that will serve it. Built per request.
#[derive(Clone)]
pub struct ResolvedTarget {
    pub provider: Provider,
    pub model: String,
    pub client: Arc<dyn LlmClient>,
}

impl std::fmt::Debug for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTarget")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("client", &self.client.display_name())
            .finish()
    }
}

/// Resolves requests against preferences, the environment, and a client cache.
pub struct ProviderResolver {
    store: PreferenceStore,
    env: Arc<dyn EnvLookup>,
    cache: Arc<ClientCache>,
}

impl ProviderResolver {
    pub fn new(store: PreferenceStore, env: Arc<dyn EnvLookup>, cache: Arc<ClientCache>) -> Self {
        Self { store, env, cache }
    }

    /// Process environment, `~/.aiwand/config.json`, and HTTP clients.
    pub fn from_env() -> Self {
        let env: Arc<dyn EnvLookup> = Arc::new(ProcessEnv);
        let cache = Arc::new(ClientCache::with_http(env.clone()));
        Self::new(PreferenceStore::default(), env, cache)
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn env(&self) -> &dyn EnvLookup {
        self.env.as_ref()
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// Choose provider and model without touching the client cache.
    pub fn select(&self, provider: Option<Provider>, model: Option<&str>) -> Result<Selection> {
        let selection = match (provider, model) {
            (Some(provider), Some(model)) => Selection {
                provider,
                model: model.to_string(),
            },
            (Some(provider), None) => Selection {
                provider,
                model: registry::default_model(provider).to_string(),
            },
            (None, Some(model)) => match registry::infer_provider(model) {
                Some(provider) => Selection {
                    provider,
                    model: model.to_string(),
                },
                None => {
                    let provider = self.preferred_selection()?.provider;
                    warn!(
                        model,
                        provider = %provider,
                        "Could not infer provider for model, using preferred provider"
                    );
                    Selection {
                        provider,
                        model: model.to_string(),
                    }
                }
            },
            (None, None) => self.preferred_selection()?,
        };

        debug!(provider = %selection.provider, model = %selection.model, "Resolved target");
        Ok(selection)
    }

    /// Choose provider and model, then fetch the client for that provider.
    pub fn resolve(&self, provider: Option<Provider>, model: Option<&str>) -> Result<ResolvedTarget> {
        let Selection { provider, model } = self.select(provider, model)?;
        let client = self.cache.get_client(provider)?;
        Ok(ResolvedTarget {
            provider,
            model,
            client,
        })
    }

    /// The provider and model used when the caller specifies neither.
    pub fn preferred_selection(&self) -> Result<Selection> {
        let prefs = self.store.load();
        let provider = self.preferred_provider(&prefs).ok_or_else(|| {
            AiError::Configuration(
                "No provider available. Please set OPENAI_API_KEY or GEMINI_API_KEY, \
                 or run 'aiwand setup' to configure your preferences."
                    .into(),
            )
        })?;
        Ok(Selection {
            provider,
            model: preferred_model(&prefs, provider).to_string(),
        })
    }

    /// Provider that a call without explicit arguments would use.
    pub fn current_provider(&self) -> Option<Provider> {
        self.preferred_selection().ok().map(|s| s.provider)
    }

    /// Model that a call without explicit arguments would use.
    pub fn current_model_name(&self) -> Result<String> {
        self.preferred_selection().map(|s| s.model)
    }

    /// Each provider in priority order with whether its API key is set.
    pub fn available_providers(&self) -> Vec<(Provider, bool)> {
        PROVIDERS
            .iter()
            .map(|spec| (spec.provider, self.env.has_api_key(spec.provider)))
            .collect()
    }

    fn preferred_provider(&self, prefs: &Preferences) -> Option<Provider> {
        if let Some(provider) = prefs.default_provider {
            if self.env.has_api_key(provider) {
                return Some(provider);
            }
            debug!(provider = %provider, "Preferred provider has no API key");
        }

        if let Some(raw) = self.env.var(DEFAULT_PROVIDER_ENV) {
            match raw.parse::<Provider>() {
                Ok(provider) if self.env.has_api_key(provider) => return Some(provider),
                Ok(provider) => debug!(provider = %provider, "AI_DEFAULT_PROVIDER has no API key"),
                Err(e) if !raw.trim().is_empty() => warn!("Ignoring AI_DEFAULT_PROVIDER: {}", e),
                Err(_) => {}
            }
        }

        PROVIDERS
            .iter()
            .map(|spec| spec.provider)
            .find(|p| self.env.has_api_key(*p))
    }
}

/// The saved model for `provider` if it is a known one, else the default.
fn preferred_model(prefs: &Preferences, provider: Provider) -> &'static str {
    match prefs.preferred_model(provider) {
        Some(raw) => registry::resolve_enum(provider, raw).unwrap_or_else(|| {
            warn!(model = raw, provider = %provider, "Unknown preferred model, using default");
            registry::default_model(provider)
        }),
        None => registry::default_model(provider),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
