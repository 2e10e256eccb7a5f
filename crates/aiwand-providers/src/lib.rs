//! Provider layer for AIWand.
//!
//! # Architecture
//!
//! - [`registry`]: static specs for OpenAI and Gemini + model lookup and inference
//! - [`traits::LlmClient`]: trait the dispatch core calls through
//! - [`http_client::HttpClient`]: OpenAI-compatible HTTP client used for both providers
//! - [`cache::ClientCache`]: one lazily built client per provider
//! - [`resolver::ProviderResolver`]: explicit args > inference > preferences > env

pub mod cache;
pub mod env;
pub mod http_client;
pub mod registry;
pub mod resolver;
pub mod traits;

// Re-export main types for convenience
pub use cache::{ClientCache, ClientFactory, HttpClientFactory};
pub use env::{EnvLookup, ProcessEnv};
pub use http_client::HttpClient;
pub use registry::{ProviderSpec, PROVIDERS};
pub use resolver::{ProviderResolver, ResolvedTarget, Selection};
pub use traits::{ClientError, CompletionRequest, LlmClient};
