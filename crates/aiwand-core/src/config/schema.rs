//! Preferences schema: the flat document persisted at `~/.aiwand/config.json`.
//!
//! ```json
//! { "default_provider": "gemini", "models": { "gemini": "gemini-2.5-flash" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Provider;

/// User preferences: a preferred provider and a preferred model per provider.
///
/// Absent fields mean "no preference yet".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<Provider>,
    pub models: BTreeMap<Provider, String>,
}

impl Preferences {
    /// Whether nothing has been configured.
    pub fn is_empty(&self) -> bool {
        self.default_provider.is_none() && self.models.is_empty()
    }

    /// The raw preferred model string for a provider, unvalidated.
    pub fn preferred_model(&self, provider: Provider) -> Option<&str> {
        self.models.get(&provider).map(String::as_str)
    }

    /// Make `provider` the default and remember `model` for it.
    ///
    /// Models saved for other providers are kept.
    pub fn set_default(&mut self, provider: Provider, model: impl Into<String>) {
        self.default_provider = Some(provider);
        self.models.insert(provider, model.into());
    }
}
