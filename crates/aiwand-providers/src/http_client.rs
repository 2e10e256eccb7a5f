//! HTTP client for OpenAI-compatible chat completion APIs.
//!
//! OpenAI is called at its standard base URL; Gemini through its
//! OpenAI-compatible endpoint. Structured completions send a strict
//! `json_schema` response format on the same route.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use aiwand_core::types::{ChatCompletionRequest, ChatCompletionResponse};
use aiwand_core::ResponseSchema;

use crate::registry::DEFAULT_API_BASE;
use crate::traits::{ClientError, CompletionRequest, LlmClient};

/// Per-request timeout applied by the underlying `reqwest` client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ─────────────────────────────────────────────
// HttpClient
// ─────────────────────────────────────────────

/// A client for one provider's OpenAI-compatible HTTP API.
pub struct HttpClient {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    display_name: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_base", &self.api_base)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl HttpClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `api_key`     : Bearer token
    /// * `api_base`    : Base URL override; `None` uses the standard OpenAI path
    /// * `display_name`: Provider name used in logs
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<&str>,
        display_name: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpClient {
            client,
            api_base: api_base.unwrap_or(DEFAULT_API_BASE).to_string(),
            api_key: api_key.into(),
            display_name: display_name.into(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// POST a request body and return the first choice's text.
    async fn send(&self, body: &ChatCompletionRequest) -> Result<String, ClientError> {
        debug!(
            provider = %self.display_name,
            model = %body.model,
            messages = body.messages.len(),
            structured = body.response_format.is_some(),
            "Calling LLM"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.display_name, error = %e, "HTTP request failed");
                ClientError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = %self.display_name,
                status = %status,
                body = %body,
                "API error"
            );
            let status = status.as_u16();
            return Err(if status == 401 || status == 403 {
                ClientError::Unauthorized { status, body }
            } else {
                ClientError::Api { status, body }
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(provider = %self.display_name, error = %e, "Failed to parse LLM response");
            ClientError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse("no choices in response".into()))?;

        debug!(
            provider = %self.display_name,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );

        match (choice.message.content, choice.message.refusal) {
            (Some(content), _) => Ok(content),
            (None, Some(refusal)) => Err(ClientError::InvalidResponse(format!(
                "model refused the request: {refusal}"
            ))),
            (None, None) => Err(ClientError::InvalidResponse(
                "response has no content".into(),
            )),
        }
    }

    fn request_body(request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            response_format: request.response_format.clone(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError> {
        self.send(&Self::request_body(request)).await
    }

    async fn complete_structured(
        &self,
        request: &CompletionRequest,
        schema: &ResponseSchema,
    ) -> Result<String, ClientError> {
        let mut body = Self::request_body(request);
        body.response_format = Some(schema.to_response_format());
        self.send(&body).await
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
