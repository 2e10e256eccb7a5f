//! Shared fixtures: scripted clients and a wand wired to them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use aiwand_core::config::PreferenceStore;
use aiwand_core::{AiError, Provider, ResponseSchema, Result};
use aiwand_providers::{
    ClientCache, ClientError, ClientFactory, CompletionRequest, EnvLookup, LlmClient,
    ProviderResolver,
};

use crate::fetch::ContentFetcher;
use crate::wand::AiWand;

/// One recorded call to a [`MockClient`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub request: CompletionRequest,
    /// Set when the structured path was taken.
    pub schema: Option<ResponseSchema>,
}

/// Replies from a queue (default `"ok"`) and records every request.
#[derive(Default)]
pub struct MockClient {
    replies: Mutex<VecDeque<std::result::Result<String, ClientError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockClient {
    pub fn reply(&self, reply: std::result::Result<String, ClientError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(
        &self,
        request: &CompletionRequest,
        schema: Option<&ResponseSchema>,
    ) -> std::result::Result<String, ClientError> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            schema: schema.cloned(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".into()))
    }
}

/// Shares one client per provider so tests can keep a handle to it.
struct SharedClient(Arc<MockClient>);

#[async_trait]
impl LlmClient for SharedClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, ClientError> {
        self.0.answer(request, None)
    }

    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        schema: &ResponseSchema,
    ) -> std::result::Result<String, ClientError> {
        self.0.answer(request, Some(schema))
    }

    fn display_name(&self) -> &str {
        "mock"
    }
}

struct MockFactory {
    openai: Arc<MockClient>,
    gemini: Arc<MockClient>,
}

impl ClientFactory for MockFactory {
    fn create(
        &self,
        provider: Provider,
        _api_key: &str,
        _api_base: Option<&str>,
    ) -> std::result::Result<Arc<dyn LlmClient>, ClientError> {
        let client = match provider {
            Provider::OpenAi => self.openai.clone(),
            Provider::Gemini => self.gemini.clone(),
        };
        Ok(Arc::new(SharedClient(client)))
    }
}

/// Serves links from a map; anything else is a fetch error.
#[derive(Default)]
pub struct MapFetcher(pub HashMap<String, String>);

#[async_trait]
impl ContentFetcher for MapFetcher {
    async fn fetch(&self, link: &str) -> Result<String> {
        self.0.get(link).cloned().ok_or_else(|| AiError::Fetch {
            link: link.to_string(),
            reason: "not found".into(),
        })
    }
}

/// An [`AiWand`] over mock clients, a map environment, and a temp preferences file.
pub struct TestWand {
    pub wand: AiWand,
    pub openai: Arc<MockClient>,
    pub gemini: Arc<MockClient>,
    pub store: PreferenceStore,
    _dir: TempDir,
}

impl TestWand {
    pub fn with_env(pairs: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("config.json"));
        let env: Arc<dyn EnvLookup> = Arc::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        );
        let openai = Arc::new(MockClient::default());
        let gemini = Arc::new(MockClient::default());
        let factory = Arc::new(MockFactory {
            openai: openai.clone(),
            gemini: gemini.clone(),
        });
        let cache = Arc::new(ClientCache::new(env.clone(), factory));
        let wand = AiWand::new(ProviderResolver::new(store.clone(), env, cache));
        Self {
            wand,
            openai,
            gemini,
            store,
            _dir: dir,
        }
    }

    pub fn openai_only() -> Self {
        Self::with_env(&[("OPENAI_API_KEY", "sk-test")])
    }

    pub fn both() -> Self {
        Self::with_env(&[("OPENAI_API_KEY", "sk-test"), ("GEMINI_API_KEY", "g-test")])
    }

    pub fn with_fetcher(mut self, fetcher: impl ContentFetcher + 'static) -> Self {
        self.wand = self.wand.with_fetcher(Arc::new(fetcher));
        self
    }
}
