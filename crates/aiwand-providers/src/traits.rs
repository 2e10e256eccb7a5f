//! LLM client trait: the seam between the dispatch core and the network.
//!
//! [`HttpClient`](crate::http_client::HttpClient) covers both providers through
//! their OpenAI-compatible `/chat/completions` endpoints; tests substitute
//! their own implementations.

use async_trait::async_trait;
use thiserror::Error;

use aiwand_core::types::ResponseFormat;
use aiwand_core::{Message, ResponseSchema};

/// Parameters of a single completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Nucleus sampling.
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    /// Forwarded as-is on the plain completion path.
    pub response_format: Option<ResponseFormat>,
}

/// Failures reported by an [`LlmClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The provider rejected the API key (HTTP 401/403).
    #[error("{status}: {body}")]
    Unauthorized { status: u16, body: String },

    /// Any other non-success HTTP status.
    #[error("{status}: {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),

    /// The response body was not a usable chat completion.
    #[error("{0}")]
    InvalidResponse(String),

    /// The client cannot serve this kind of request.
    #[error("{0}")]
    Unsupported(String),
}

/// A constructed API client for one provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain chat completion. Returns the assistant text, untrimmed.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError>;

    /// Structured completion: the answer must conform to `schema`.
    ///
    /// Returns the raw JSON text of the answer.
    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        schema: &ResponseSchema,
    ) -> Result<String, ClientError> {
        let _ = (request, schema);
        Err(ClientError::Unsupported(format!(
            "{} does not support structured completions",
            self.display_name()
        )))
    }

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
