//! Core building blocks shared by every AIWand crate.
//!
//! - [`types`]: providers, chat messages, and the OpenAI-compatible wire format
//! - [`error`]: the [`AiError`] taxonomy surfaced to callers
//! - [`config`]: the persisted preferences document and its store
//! - [`utils`]: data directory lookup and small string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{AiError, Result};
pub use types::{Message, Provider, ResponseSchema, Role};
