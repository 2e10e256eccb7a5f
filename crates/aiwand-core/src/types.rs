//! Core types for AIWand: providers, chat messages, and the OpenAI-compatible
//! wire format shared by both backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// One of the two supported remote LLM backends.
///
/// Serialized as `"openai"` / `"gemini"`, which is also the form used as keys
/// in the preferences document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    /// Lowercase name used on disk and in environment overrides.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Role of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A text chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content } => content,
        }
    }

    pub fn content_mut(&mut self) -> &mut String {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content } => content,
        }
    }
}

// ─────────────────────────────────────────────
// Structured output
// ─────────────────────────────────────────────

/// A JSON Schema the model's answer must conform to.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    /// Schema name sent to the provider (letters, digits, `_` and `-`).
    pub name: String,
    /// JSON Schema of the expected object.
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Build an object schema whose properties are all required strings.
    ///
    /// `fields` is a list of `(name, description)` pairs.
    pub fn string_object(name: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let mut properties = serde_json::Map::new();
        for (field, description) in fields {
            properties.insert(
                (*field).to_string(),
                serde_json::json!({ "type": "string", "description": description }),
            );
        }
        let required: Vec<&str> = fields.iter().map(|(f, _)| *f).collect();
        Self::new(
            name,
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            }),
        )
    }

    /// Field names listed under the schema's `required` keyword.
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }

    /// The `response_format` payload for an OpenAI-compatible request.
    pub fn to_response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: self.name.clone(),
                schema: self.schema.clone(),
                strict: true,
            },
        }
    }
}

// ─────────────────────────────────────────────
// Chat completion wire format
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// `response_format` field of a chat completion request.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// Raw chat completion response from an OpenAI-compatible API.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageInfo>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    /// Set instead of `content` when a structured request is refused.
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Token usage statistics from the LLM.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_serialization() {
        assert_eq!(serde_json::to_value(Provider::OpenAi).unwrap(), json!("openai"));
        assert_eq!(serde_json::to_value(Provider::Gemini).unwrap(), json!("gemini"));
    }

    #[test]
    fn test_provider_from_str_case_insensitive() {
        assert_eq!(" Gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("OPENAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("claude".parse::<Provider>().is_err());
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::system("You are helpful.");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "You are helpful."}));
    }

    #[test]
    fn test_message_deserialization() {
        let msg: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), "hi");
    }

    #[test]
    fn test_content_mut() {
        let mut msg = Message::user("a");
        msg.content_mut().push('b');
        assert_eq!(msg.content(), "ab");
    }

    #[test]
    fn test_string_object_schema() {
        let schema = ResponseSchema::string_object(
            "grade",
            &[("reasoning", "Why"), ("grade", "Final grade")],
        );
        assert_eq!(schema.required_fields(), vec!["reasoning", "grade"]);
        assert_eq!(schema.schema["properties"]["grade"]["type"], "string");
        assert_eq!(schema.schema["additionalProperties"], false);
    }

    #[test]
    fn test_response_format_serialization() {
        let schema = ResponseSchema::string_object("answer", &[("text", "The answer")]);
        let value = serde_json::to_value(schema.to_response_format()).unwrap();
        assert_eq!(value["type"], "json_schema");
        assert_eq!(value["json_schema"]["name"], "answer");
        assert_eq!(value["json_schema"]["strict"], true);
    }

    #[test]
    fn test_chat_request_skips_empty_options() {
        let req = ChatCompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: None,
            response_format: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert!(value.get("response_format").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_completion_response_parsing() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": { "content": "Hello" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4 }
        }))
        .unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("Hello"));
        assert_eq!(resp.usage.unwrap().total_tokens, 4);
    }
}
