//! AIWand: one call surface over OpenAI and Gemini.
//!
//! ```no_run
//! # async fn demo() -> aiwand::Result<()> {
//! use aiwand::{AiWand, SummaryStyle};
//!
//! let wand = AiWand::from_env();
//! let summary = wand
//!     .summarize("Rust is a systems language...", Some(20), SummaryStyle::Concise, None)
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! Every helper builds a [`DispatchRequest`] and goes through
//! [`AiWand::dispatch`]; provider and model resolution live in
//! `aiwand-providers`.

pub mod classifier;
pub mod dispatch;
pub mod extract;
pub mod fetch;
pub mod text;
pub mod wand;

#[cfg(test)]
mod test_support;

pub use aiwand_core::{AiError, Message, Provider, ResponseSchema, Result, Role};
pub use classifier::{ChoiceScores, ClassifierMetadata, ClassifierResponse, Classifier, ClassifyRequest};
pub use dispatch::{Completion, DispatchRequest, Response};
pub use extract::ExtractRequest;
pub use fetch::{ContentFetcher, DefaultFetcher};
pub use text::SummaryStyle;
pub use wand::AiWand;
