//! Error taxonomy for AIWand.
//!
//! Library callers branch on the variant; the CLI prints the message plus
//! [`AiError::hint`].

use thiserror::Error;

/// Every failure the AIWand core can report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AiError {
    /// Blank or missing required input. A caller bug, never retried.
    #[error("{0}")]
    Validation(String),

    /// No usable provider or API key in the environment.
    #[error("{0}")]
    Configuration(String),

    /// API key missing when a client is built, or rejected by the provider.
    #[error("{0}")]
    Authentication(String),

    /// A structured response failed to parse or decode against its schema.
    #[error("invalid structured response: {0}")]
    Data(String),

    /// Catch-all for client and network failures, carrying the original message.
    #[error("AI request failed: {0}")]
    Request(String),

    /// The preferences document could not be written.
    #[error("failed to save preferences: {0}")]
    Storage(String),

    /// A link or file passed to `extract` could not be read.
    #[error("failed to process link '{link}': {reason}")]
    Fetch { link: String, reason: String },
}

impl AiError {
    /// Remediation text for CLI-style callers, if there is a useful one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AiError::Configuration(_) => Some(
                "Set OPENAI_API_KEY or GEMINI_API_KEY, then run `aiwand setup` to pick a default.",
            ),
            AiError::Authentication(_) => {
                Some("Check that the API key for the selected provider is set and valid.")
            }
            AiError::Storage(_) => Some("Check permissions on ~/.aiwand/config.json."),
            _ => None,
        }
    }
}

/// Result alias used across the AIWand crates.
pub type Result<T> = std::result::Result<T, AiError>;
