//! Structured extraction from inline content, URLs, and local files.

use tracing::debug;

use aiwand_core::{AiError, ResponseSchema, Result};

use crate::dispatch::{strip_code_fences, DispatchRequest, Response};
use crate::fetch::LinkKind;
use crate::wand::AiWand;

const EXTRACT_SYSTEM_PROMPT: &str = "You are an expert data extraction specialist. You excel at \
identifying, analyzing, and extracting structured information from unstructured text. You \
provide accurate, well-organized data while preserving context and maintaining data integrity. \
You follow the specified format requirements precisely.";

const EXTRACT_INSTRUCTIONS: &str = "Extract relevant structured data from the following content:\n\n\
Organize the extracted data in a clear, logical structure. return the data as JSON format. \
Use appropriate categories and present the information in a way that's easy to understand and \
use. Include any relevant metadata or context.\n\n";

/// Parameters of an `extract` call.
#[derive(Clone, Debug)]
pub struct ExtractRequest {
    pub content: Option<String>,
    /// URLs (`http(s)://`, `www.`) or file paths.
    pub links: Vec<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub response_schema: Option<ResponseSchema>,
}

impl Default for ExtractRequest {
    fn default() -> Self {
        Self {
            content: None,
            links: Vec::new(),
            model: None,
            temperature: 0.7,
            response_schema: None,
        }
    }
}

impl ExtractRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Use a JSON value as content, pretty-printed.
    pub fn json_content(self, value: &serde_json::Value) -> Self {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        self.content(text)
    }

    pub fn links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

impl AiWand {
    /// Extract structured data from content and/or links.
    ///
    /// With a schema the answer is validated against it; without one the
    /// answer is returned as JSON when it parses, else as text.
    pub async fn extract(&self, request: ExtractRequest) -> Result<Response> {
        let has_content = request.content.as_deref().is_some_and(|c| !c.is_empty());
        if !has_content && request.links.is_empty() {
            return Err(AiError::Validation(
                "Must provide either content or links".into(),
            ));
        }

        let sections = self.gather_sections(&request).await?;
        if sections.is_empty() {
            return Err(AiError::Validation(
                "No valid content found to process".into(),
            ));
        }

        let user_prompt = format!(
            "{EXTRACT_INSTRUCTIONS}Content to extract from:\n{}",
            sections.join("\n\n")
        );

        let mut dispatch = DispatchRequest::new()
            .system_prompt(EXTRACT_SYSTEM_PROMPT)
            .user_prompt(user_prompt)
            .temperature(request.temperature)
            .model(request.model.clone());
        if let Some(schema) = &request.response_schema {
            dispatch = dispatch.response_schema(schema.clone());
        }

        match self.dispatch(dispatch).await? {
            Response::Text(text) => Ok(json_or_text(text)),
            structured => Ok(structured),
        }
    }

    async fn gather_sections(&self, request: &ExtractRequest) -> Result<Vec<String>> {
        let mut sections = Vec::with_capacity(request.links.len() + 1);

        if let Some(content) = request.content.as_deref().filter(|c| !c.trim().is_empty()) {
            sections.push(format!("=== Main Content ===\n{content}"));
        }

        for (i, link) in request.links.iter().enumerate() {
            let index = i + 1;
            let label = if LinkKind::classify(link).is_local() {
                "File"
            } else {
                "Link"
            };
            debug!(link = %link, "Gathering extract source");
            let text = self.fetcher().fetch(link).await.map_err(|e| match e {
                AiError::Fetch { .. } => e,
                other => AiError::Fetch {
                    link: link.clone(),
                    reason: other.to_string(),
                },
            })?;
            sections.push(format!("=== {label} {index}: {link} ===\n{text}"));
        }

        Ok(sections)
    }
}

fn json_or_text(text: String) -> Response {
    match serde_json::from_str::<serde_json::Value>(strip_code_fences(&text)) {
        Ok(value) if value.is_object() || value.is_array() => Response::Structured(value),
        _ => Response::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MapFetcher, TestWand};
    use std::collections::HashMap;

    fn fetcher(pairs: &[(&str, &str)]) -> MapFetcher {
        MapFetcher(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn test_requires_content_or_links() {
        let t = TestWand::openai_only();
        let err = t.wand.extract(ExtractRequest::new()).await.unwrap_err();
        assert!(matches!(err, AiError::Validation(_)));

        let err = t
            .wand
            .extract(ExtractRequest::new().content("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Validation(_)));
        assert!(t.openai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sections_and_prompts() {
        let t = TestWand::openai_only().with_fetcher(fetcher(&[
            ("https://example.com/about", "About us"),
            ("notes/card.txt", "Jane Doe"),
        ]));
        t.openai.reply(Ok("```json\n{\"name\": \"Jane Doe\"}\n```".into()));

        let response = t
            .wand
            .extract(
                ExtractRequest::new()
                    .content("Meeting notes")
                    .links(["https://example.com/about", "notes/card.txt"]),
            )
            .await
            .unwrap();
        assert_eq!(
            response,
            Response::Structured(serde_json::json!({"name": "Jane Doe"}))
        );

        let call = &t.openai.calls()[0];
        assert_eq!(call.request.messages[0].content(), EXTRACT_SYSTEM_PROMPT);
        let user = call.request.messages[1].content();
        assert!(user.starts_with("Extract relevant structured data"));
        assert!(user.ends_with(
            "Content to extract from:\n=== Main Content ===\nMeeting notes\n\n\
             === Link 1: https://example.com/about ===\nAbout us\n\n\
             === File 2: notes/card.txt ===\nJane Doe"
        ));
        assert_eq!(call.request.temperature, 0.7);
    }

    #[tokio::test]
    async fn test_plain_text_answer_kept() {
        let t = TestWand::openai_only();
        t.openai.reply(Ok("Name: Jane".into()));

        let response = t
            .wand
            .extract(ExtractRequest::new().content("Jane"))
            .await
            .unwrap();
        assert_eq!(response, Response::Text("Name: Jane".into()));
    }

    #[tokio::test]
    async fn test_fetch_failure_names_link() {
        let t = TestWand::openai_only().with_fetcher(fetcher(&[]));
        let err = t
            .wand
            .extract(ExtractRequest::new().links(["https://gone.example"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https://gone.example"));
        assert!(t.openai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_schema_forwarded() {
        let t = TestWand::openai_only();
        t.openai.reply(Ok(r#"{"email": "jane@example.com"}"#.into()));

        let schema = ResponseSchema::string_object("contact", &[("email", "Email address")]);
        let response = t
            .wand
            .extract(
                ExtractRequest::new()
                    .json_content(&serde_json::json!({"note": "mail jane@example.com"}))
                    .response_schema(schema.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.as_value().unwrap()["email"], "jane@example.com");
        let call = &t.openai.calls()[0];
        assert_eq!(call.request.response_format, Some(schema.to_response_format()));
        assert!(call.request.messages[1].content().contains("\"note\": \"mail jane@example.com\""));
    }
}
