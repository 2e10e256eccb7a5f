//! Text helpers: summarize, chat, and free-form generation.

use std::fmt;
use std::str::FromStr;

use aiwand_core::utils::is_blank;
use aiwand_core::{AiError, Message, Result};

use crate::dispatch::DispatchRequest;
use crate::wand::AiWand;

/// How `summarize` should shape its output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
    BulletPoints,
}

impl SummaryStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryStyle::Concise => "concise",
            SummaryStyle::Detailed => "detailed",
            SummaryStyle::BulletPoints => "bullet-points",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            SummaryStyle::Concise => "Provide a concise summary of the following text:",
            SummaryStyle::Detailed => "Provide a detailed summary of the following text:",
            SummaryStyle::BulletPoints => "Summarize the following text in bullet points:",
        }
    }

    /// Lenient parse: anything unrecognized is `Concise`.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Ok(SummaryStyle::Concise),
            "detailed" => Ok(SummaryStyle::Detailed),
            "bullet-points" | "bullet_points" | "bullets" => Ok(SummaryStyle::BulletPoints),
            other => Err(format!("unknown summary style '{other}'")),
        }
    }
}

impl AiWand {
    /// Summarize `text`, optionally capped at `max_length` words.
    pub async fn summarize(
        &self,
        text: &str,
        max_length: Option<u32>,
        style: SummaryStyle,
        model: Option<&str>,
    ) -> Result<String> {
        if is_blank(text) {
            return Err(AiError::Validation("Text cannot be empty".into()));
        }

        let mut instruction = style.instruction().to_string();
        if let Some(words) = max_length.filter(|w| *w > 0) {
            instruction.push_str(&format!(" Keep the summary under {words} words."));
        }

        let request = DispatchRequest::new()
            .messages(vec![Message::system(instruction), Message::user(text)])
            .max_tokens(Some(2000))
            .temperature(0.3)
            .model(model);
        Ok(self.dispatch(request).await?.into_text())
    }

    /// Send `message` after `history` and return the assistant's reply.
    pub async fn chat(
        &self,
        message: &str,
        history: &[Message],
        model: Option<&str>,
        temperature: f64,
    ) -> Result<String> {
        if is_blank(message) {
            return Err(AiError::Validation("Message cannot be empty".into()));
        }

        let mut messages = history.to_vec();
        messages.push(Message::user(message));

        let request = DispatchRequest::new()
            .messages(messages)
            .max_tokens(Some(1000))
            .temperature(temperature)
            .model(model);
        Ok(self.dispatch(request).await?.into_text())
    }

    /// Free-form generation from a single prompt.
    pub async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
        model: Option<&str>,
    ) -> Result<String> {
        if is_blank(prompt) {
            return Err(AiError::Validation("Prompt cannot be empty".into()));
        }

        let request = DispatchRequest::new()
            .messages(vec![Message::user(prompt)])
            .max_tokens(Some(max_tokens))
            .temperature(temperature)
            .model(model);
        Ok(self.dispatch(request).await?.into_text())
    }
}
