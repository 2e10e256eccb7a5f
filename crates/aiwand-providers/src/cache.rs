//! Client cache: at most one constructed client per provider.
//!
//! A client is built the first time its provider is requested and reused for
//! the lifetime of the cache. There is no invalidation: a changed API key is
//! only picked up by a new cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use aiwand_core::{AiError, Provider, Result};

use crate::env::EnvLookup;
use crate::http_client::HttpClient;
use crate::registry;
use crate::traits::{ClientError, LlmClient};

/// Builds a client for a provider once its key and base URL are known.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        provider: Provider,
        api_key: &str,
        api_base: Option<&str>,
    ) -> std::result::Result<Arc<dyn LlmClient>, ClientError>;
}

/// Builds [`HttpClient`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create(
        &self,
        provider: Provider,
        api_key: &str,
        api_base: Option<&str>,
    ) -> std::result::Result<Arc<dyn LlmClient>, ClientError> {
        let client = HttpClient::new(api_key, api_base, registry::spec(provider).display_name)?;
        Ok(Arc::new(client))
    }
}

/// Memoized provider → client map.
pub struct ClientCache {
    env: Arc<dyn EnvLookup>,
    factory: Arc<dyn ClientFactory>,
    clients: Mutex<HashMap<Provider, Arc<dyn LlmClient>>>,
}

impl ClientCache {
    pub fn new(env: Arc<dyn EnvLookup>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            env,
            factory,
            clients: Mutex::new(HashMap::with_capacity(registry::PROVIDERS.len())),
        }
    }

    /// A cache building real HTTP clients.
    pub fn with_http(env: Arc<dyn EnvLookup>) -> Self {
        Self::new(env, Arc::new(HttpClientFactory))
    }

    /// The client for `provider`, building it on first use.
    pub fn get_client(&self, provider: Provider) -> Result<Arc<dyn LlmClient>> {
        if let Some(client) = self.lock().get(&provider) {
            return Ok(Arc::clone(client));
        }

        let spec = registry::spec(provider);
        let api_key = self.env.api_key(provider).ok_or_else(|| {
            AiError::Authentication(format!(
                "{} API key not found. Please set the {} environment variable.",
                spec.display_name, spec.env_key
            ))
        })?;

        debug!(
            provider = spec.display_name,
            api_base = spec.api_base.unwrap_or("default"),
            "Creating LLM client"
        );
        let client = self
            .factory
            .create(provider, &api_key, spec.api_base)
            .map_err(|e| AiError::Request(e.to_string()))?;

        // Built outside the lock; if another caller got there first, keep theirs.
        let mut clients = self.lock();
        Ok(Arc::clone(clients.entry(provider).or_insert(client)))
    }

    /// Number of clients built so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Provider, Arc<dyn LlmClient>>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CompletionRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient;

    #[async_trait]
    impl LlmClient for StubClient {
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, ClientError> {
            Ok("stub".into())
        }

        fn display_name(&self) -> &str {
            "stub"
        }
    }

    /// Records every construction.
    #[derive(Default)]
    struct CountingFactory {
        built: AtomicUsize,
        bases: Mutex<Vec<Option<String>>>,
    }

    impl ClientFactory for CountingFactory {
        fn create(
            &self,
            _provider: Provider,
            _api_key: &str,
            api_base: Option<&str>,
        ) -> std::result::Result<Arc<dyn LlmClient>, ClientError> {
            self.built.fetch_add(1, Ordering::SeqCst);
            self.bases.lock().unwrap().push(api_base.map(String::from));
            Ok(Arc::new(StubClient))
        }
    }

    fn env(pairs: &[(&str, &str)]) -> Arc<dyn EnvLookup> {
        Arc::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_client_is_memoized() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(env(&[("OPENAI_API_KEY", "sk-1")]), factory.clone());

        let first = cache.get_client(Provider::OpenAi).unwrap();
        let second = cache.get_client(Provider::OpenAi).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_one_client_per_provider() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(
            env(&[("OPENAI_API_KEY", "sk-1"), ("GEMINI_API_KEY", "g-1")]),
            factory.clone(),
        );

        let openai = cache.get_client(Provider::OpenAi).unwrap();
        let gemini = cache.get_client(Provider::Gemini).unwrap();

        assert!(!Arc::ptr_eq(&openai, &gemini));
        assert_eq!(factory.built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_gemini_gets_base_override() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(
            env(&[("OPENAI_API_KEY", "sk-1"), ("GEMINI_API_KEY", "g-1")]),
            factory.clone(),
        );

        cache.get_client(Provider::OpenAi).unwrap();
        cache.get_client(Provider::Gemini).unwrap();

        let bases = factory.bases.lock().unwrap();
        assert_eq!(bases[0], None);
        assert!(bases[1].as_deref().unwrap().contains("googleapis.com"));
    }

    #[test]
    fn test_missing_key_is_authentication_error() {
        let cache = ClientCache::new(env(&[]), Arc::new(CountingFactory::default()));
        let err = cache.get_client(Provider::Gemini).err().unwrap();
        assert!(matches!(err, AiError::Authentication(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(cache.is_empty());
    }

    /// Holds each `create` call until every barrier party is building.
    struct RendezvousFactory {
        barrier: std::sync::Barrier,
        built: AtomicUsize,
    }

    impl ClientFactory for RendezvousFactory {
        fn create(
            &self,
            _provider: Provider,
            _api_key: &str,
            _api_base: Option<&str>,
        ) -> std::result::Result<Arc<dyn LlmClient>, ClientError> {
            self.built.fetch_add(1, Ordering::SeqCst);
            self.barrier.wait();
            Ok(Arc::new(StubClient))
        }
    }

    #[test]
    fn test_concurrent_first_use_keeps_one_client() {
        let factory = Arc::new(RendezvousFactory {
            barrier: std::sync::Barrier::new(2),
            built: AtomicUsize::new(0),
        });
        let cache = ClientCache::new(env(&[("OPENAI_API_KEY", "sk-1")]), factory.clone());

        let (first, second) = std::thread::scope(|scope| {
            let a = scope.spawn(|| cache.get_client(Provider::OpenAi).unwrap());
            let b = scope.spawn(|| cache.get_client(Provider::OpenAi).unwrap());
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(factory.built.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first, &cache.get_client(Provider::OpenAi).unwrap()));
    }

    #[test]
    fn test_http_factory_builds_client() {
        let cache = ClientCache::with_http(env(&[("OPENAI_API_KEY", "sk-1")]));
        let client = cache.get_client(Provider::OpenAi).unwrap();
        assert_eq!(client.display_name(), "OpenAI");
    }
}
