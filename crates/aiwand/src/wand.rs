//! The [`AiWand`] handle: owns resolution state and the content fetcher.

use std::sync::Arc;

use aiwand_core::{Provider, Result};
use aiwand_providers::ProviderResolver;

use crate::fetch::{ContentFetcher, DefaultFetcher};

/// Entry point for every AIWand operation.
///
/// Cheap to share behind an `Arc`; holds the client cache, so building one per
/// process keeps "one client per provider".
pub struct AiWand {
    resolver: ProviderResolver,
    fetcher: Arc<dyn ContentFetcher>,
}

impl AiWand {
    pub fn new(resolver: ProviderResolver) -> Self {
        Self {
            resolver,
            fetcher: Arc::new(DefaultFetcher::new()),
        }
    }

    /// Process environment, `~/.aiwand/config.json`, and real HTTP clients.
    pub fn from_env() -> Self {
        Self::new(ProviderResolver::from_env())
    }

    /// Replace the fetcher used by `extract` for links.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn resolver(&self) -> &ProviderResolver {
        &self.resolver
    }

    pub(crate) fn fetcher(&self) -> &dyn ContentFetcher {
        self.fetcher.as_ref()
    }

    /// Provider used when a call names neither provider nor model.
    pub fn current_provider(&self) -> Option<Provider> {
        self.resolver.current_provider()
    }

    /// Model used when a call names neither provider nor model.
    pub fn current_model_name(&self) -> Result<String> {
        self.resolver.current_model_name()
    }
}
