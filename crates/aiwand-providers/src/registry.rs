//! Model registry: static specs for the two supported providers.
//!
//! Each [`ProviderSpec`] describes how to reach a provider and which models it
//! serves. Everything here is a pure lookup over static data.

use aiwand_core::Provider;

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one provider
// ─────────────────────────────────────────────

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub provider: Provider,
    /// Human-readable name for logs and menus. E.g. `"OpenAI"`.
    pub display_name: &'static str,
    /// Environment variable holding the API key.
    pub env_key: &'static str,
    /// Base URL override. `None` means the standard OpenAI endpoint.
    pub api_base: Option<&'static str>,
    /// Known models, in menu order.
    pub models: &'static [&'static str],
    /// Recommended model.
    pub default_model: &'static str,
    /// Lowercase substrings that mark a model as belonging to this provider.
    pub keywords: &'static [&'static str],
    /// Lowercase prefixes that mark a model as belonging to this provider.
    pub prefixes: &'static [&'static str],
}

/// Standard OpenAI API base, used when a spec has no override.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Provider specs in resolution priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        provider: Provider::OpenAi,
        display_name: "OpenAI",
        env_key: "OPENAI_API_KEY",
        api_base: None,
        models: &[
            // Reasoning models
            "o3-mini",
            "o3",
            "o1",
            "o1-mini",
            // GPT-4.1 series
            "gpt-4.1",
            "gpt-4.1-mini",
            // GPT-4o series
            "gpt-4o",
            "gpt-4o-mini",
            // Legacy
            "gpt-4-turbo",
            "gpt-4",
            "gpt-3.5-turbo",
        ],
        default_model: "gpt-4o",
        keywords: &["gpt", "openai"],
        prefixes: &["o1", "o3", "o4"],
    },
    ProviderSpec {
        provider: Provider::Gemini,
        display_name: "Gemini",
        env_key: "GEMINI_API_KEY",
        api_base: Some("https://generativelanguage.googleapis.com/v1beta/openai/"),
        models: &[
            // Gemini 2.5 series
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-2.5-flash-lite",
            // Gemini 2.0 series
            "gemini-2.0-flash-exp",
            "gemini-2.0-flash",
            "gemini-2.0-pro",
            // Legacy
            "gemini-1.5-flash",
            "gemini-1.5-pro",
        ],
        default_model: "gemini-2.0-flash",
        keywords: &["gemini"],
        prefixes: &[],
    },
];

// ─────────────────────────────────────────────
// Lookup functions
// ─────────────────────────────────────────────

/// The static spec for a provider.
pub fn spec(provider: Provider) -> &'static ProviderSpec {
    match provider {
        Provider::OpenAi => &PROVIDERS[0],
        Provider::Gemini => &PROVIDERS[1],
    }
}

/// Recommended model for a provider.
pub fn default_model(provider: Provider) -> &'static str {
    spec(provider).default_model
}

/// Known models for a provider, in menu order.
pub fn models_for(provider: Provider) -> &'static [&'static str] {
    spec(provider).models
}

/// Validate a free-form string against the provider's known models.
pub fn resolve_enum(provider: Provider, raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    models_for(provider).iter().copied().find(|m| *m == raw)
}

/// Work out which provider serves a model.
///
/// Exact membership wins; otherwise keyword and prefix heuristics are applied.
/// A model matching several providers' heuristics, or none, yields `None`.
pub fn infer_provider(model: &str) -> Option<Provider> {
    let model = model.trim();
    if let Some(spec) = PROVIDERS.iter().find(|s| s.models.contains(&model)) {
        return Some(spec.provider);
    }

    let lower = model.to_lowercase();
    let mut matches = PROVIDERS.iter().filter(|spec| {
        spec.keywords.iter().any(|kw| lower.contains(kw))
            || spec.prefixes.iter().any(|p| lower.starts_with(p))
    });

    match (matches.next(), matches.next()) {
        (Some(spec), None) => Some(spec.provider),
        _ => None,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
