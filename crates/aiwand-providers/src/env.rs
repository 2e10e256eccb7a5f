//! Environment access for API keys and the default-provider override.

use std::collections::HashMap;

use aiwand_core::Provider;

use crate::registry;

/// Environment variable that names a provider to prefer over the scan order.
pub const DEFAULT_PROVIDER_ENV: &str = "AI_DEFAULT_PROVIDER";

/// Read-only view of environment variables.
pub trait EnvLookup: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;

    /// The provider's API key, if set and non-empty.
    fn api_key(&self, provider: Provider) -> Option<String> {
        self.var(registry::spec(provider).env_key)
            .filter(|key| !key.trim().is_empty())
    }

    fn has_api_key(&self, provider: Provider) -> bool {
        self.api_key(provider).is_some()
    }
}

/// The real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables, for tests and embedding hosts.
impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_api_key_lookup() {
        let vars = env(&[("OPENAI_API_KEY", "sk-test")]);
        assert_eq!(vars.api_key(Provider::OpenAi).as_deref(), Some("sk-test"));
        assert!(!vars.has_api_key(Provider::Gemini));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let vars = env(&[("GEMINI_API_KEY", "  ")]);
        assert!(!vars.has_api_key(Provider::Gemini));
    }
}
