//! Request dispatch: message assembly, call-path selection, and response
//! normalization.
//!
//! Every AIWand operation ends in [`AiWand::dispatch`] (or one of its typed
//! variants). Client failures are mapped into [`AiError`] here and nowhere else.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use aiwand_core::{AiError, Message, Provider, ResponseSchema, Result, Role};
use aiwand_providers::{ClientError, CompletionRequest, ResolvedTarget};

use crate::wand::AiWand;

/// System prompt used when the caller supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are AIWand, a helpful AI assistant that provides \
clear, accurate, and useful responses. You excel at understanding context and providing \
well-structured answers.";

/// User turn appended when the conversation would otherwise have none.
pub const PLACEHOLDER_USER_PROMPT: &str = "Please respond according to the instructions above.";

// ─────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────

/// Everything a single dispatch needs.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchRequest {
    pub messages: Vec<Message>,
    /// `Some("")` means "no system guidance", distinct from `None` ("use the default").
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    /// Appended to the system message after a blank line. When the system
    /// content is empty the instructions become the whole system message.
    pub additional_system_instructions: Option<String>,
    pub model: Option<String>,
    pub provider: Option<Provider>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    pub response_schema: Option<ResponseSchema>,
}

impl Default for DispatchRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            user_prompt: None,
            additional_system_instructions: None,
            model: None,
            provider: None,
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: None,
            response_schema: None,
        }
    }
}

impl DispatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    pub fn additional_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.additional_system_instructions = Some(instructions.into());
        self
    }

    pub fn model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    pub fn provider(mut self, provider: Option<Provider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Normalized result of a dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// Trimmed assistant text.
    Text(String),
    /// Decoded JSON object conforming to the requested schema.
    Structured(serde_json::Value),
}

impl Response {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Structured(_) => None,
        }
    }

    /// Text as-is, or the structured value rendered as JSON.
    pub fn into_text(self) -> String {
        match self {
            Response::Text(text) => text,
            Response::Structured(value) => value.to_string(),
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Response::Text(_) => None,
            Response::Structured(value) => Some(value),
        }
    }
}

/// A response together with the provider and model that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub provider: Provider,
    pub model: String,
    pub response: Response,
}

// ─────────────────────────────────────────────
// Message assembly
// ─────────────────────────────────────────────

/// Build the conversation sent to the provider.
///
/// 1. Start from the caller's messages.
/// 2. Move an existing system message to the front, or prepend one.
/// 3. Append additional instructions to the system message.
/// 4. Append the user prompt.
/// 5. Append a placeholder user turn if nothing but system remains.
///
/// More than one system message in the caller's conversation is rejected.
pub fn assemble_messages(request: &DispatchRequest) -> Result<Vec<Message>> {
    let mut messages = request.messages.clone();

    let system_count = messages.iter().filter(|m| m.role() == Role::System).count();
    if system_count > 1 {
        return Err(AiError::Validation(format!(
            "conversation has {system_count} system messages; at most one is allowed"
        )));
    }

    match messages.iter().position(|m| m.role() == Role::System) {
        Some(0) => {}
        Some(index) => {
            let system = messages.remove(index);
            messages.insert(0, system);
        }
        None => {
            let content = request
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
            messages.insert(0, Message::system(content));
        }
    }

    if let Some(extra) = &request.additional_system_instructions {
        let content = messages[0].content_mut();
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(extra);
    }

    if let Some(user_prompt) = &request.user_prompt {
        messages.push(Message::user(user_prompt.clone()));
    }

    if !messages
        .iter()
        .any(|m| matches!(m.role(), Role::User | Role::Assistant))
    {
        messages.push(Message::user(PLACEHOLDER_USER_PROMPT));
    }

    Ok(messages)
}

// ─────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────

impl AiWand {
    /// Assemble, resolve, call, and normalize.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<Response> {
        self.dispatch_with_target(request)
            .await
            .map(|completion| completion.response)
    }

    /// Like [`dispatch`](Self::dispatch), also reporting who answered.
    pub async fn dispatch_with_target(&self, request: DispatchRequest) -> Result<Completion> {
        let messages = assemble_messages(&request)?;
        let target = self
            .resolver()
            .resolve(request.provider, request.model.as_deref())?;
        let raw = call_client(&target, &request, messages).await?;

        let response = match &request.response_schema {
            Some(schema) => Response::Structured(parse_structured(&raw, schema)?),
            None => Response::Text(raw.trim().to_string()),
        };

        Ok(Completion {
            provider: target.provider,
            model: target.model,
            response,
        })
    }

    /// Dispatch with a schema and decode the answer into `T`.
    pub async fn dispatch_as<T: DeserializeOwned>(&self, request: DispatchRequest) -> Result<T> {
        if request.response_schema.is_none() {
            return Err(AiError::Validation(
                "dispatch_as requires a response schema".into(),
            ));
        }
        let completion = self.dispatch_with_target(request).await?;
        decode_completion(completion)
    }
}

/// Decode a structured completion into a caller type.
pub(crate) fn decode_completion<T: DeserializeOwned>(completion: Completion) -> Result<T> {
    match completion.response {
        Response::Structured(value) => {
            serde_json::from_value(value).map_err(|e| AiError::Data(e.to_string()))
        }
        Response::Text(_) => Err(AiError::Data("expected a structured response".into())),
    }
}

async fn call_client(
    target: &ResolvedTarget,
    request: &DispatchRequest,
    messages: Vec<Message>,
) -> Result<String> {
    let structured = request.response_schema.is_some() && target.provider == Provider::Gemini;

    debug!(
        provider = %target.provider,
        model = %target.model,
        messages = messages.len(),
        structured,
        "Dispatching request"
    );

    let mut completion = CompletionRequest {
        model: target.model.clone(),
        messages,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_tokens,
        response_format: None,
    };

    let result = match &request.response_schema {
        Some(schema) if structured => target.client.complete_structured(&completion, schema).await,
        Some(schema) => {
            completion.response_format = Some(schema.to_response_format());
            target.client.complete(&completion).await
        }
        None => target.client.complete(&completion).await,
    };

    result.map_err(|e| {
        warn!(provider = %target.provider, error = %e, "LLM call failed");
        map_client_error(e)
    })
}

fn map_client_error(err: ClientError) -> AiError {
    match err {
        ClientError::Unauthorized { status, body } => {
            AiError::Authentication(format!("API key rejected ({status}): {body}"))
        }
        other => AiError::Request(other.to_string()),
    }
}

// ─────────────────────────────────────────────
// Structured decoding
// ─────────────────────────────────────────────

fn code_fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$").unwrap()
    })
}

/// Remove a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    code_fence_regex()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

/// Parse a structured answer and check the schema's required fields.
pub(crate) fn parse_structured(raw: &str, schema: &ResponseSchema) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AiError::Data(format!("response is not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| AiError::Data(format!("expected a JSON object for '{}'", schema.name)))?;

    let missing: Vec<&str> = schema
        .required_fields()
        .into_iter()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(AiError::Data(format!(
            "'{}' is missing required fields: {}",
            schema.name,
            missing.join(", ")
        )));
    }

    Ok(value)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
