//! Preference store: reads and writes `~/.aiwand/config.json`.
//!
//! Loading never fails: a missing, unreadable, or malformed document yields
//! empty [`Preferences`]. Saving writes a sibling temp file and renames it over
//! the target so readers never see a half-written document.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::schema::Preferences;
use crate::error::{AiError, Result};
use crate::types::Provider;

/// Default preferences file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Handle on the preferences document at a fixed path.
#[derive(Clone, Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(get_config_path())
    }
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; any failure is logged and treated as "no preferences".
    pub fn load(&self) -> Preferences {
        if !self.path.exists() {
            debug!("No preferences file at {}", self.path.display());
            return Preferences::default();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read preferences {}: {}", self.path.display(), e);
                return Preferences::default();
            }
        };

        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse preferences JSON: {}", e);
                return Preferences::default();
            }
        };

        parse_preferences(&raw)
    }

    /// Write the full document.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                if !parent.is_dir() {
                    return Err(AiError::Storage(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    )));
                }
            }
        }

        let json =
            serde_json::to_string_pretty(prefs).map_err(|e| AiError::Storage(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| AiError::Storage(format!("{}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            AiError::Storage(format!("{}: {}", self.path.display(), e))
        })?;

        info!("Preferences saved to {}", self.path.display());
        Ok(())
    }
}

/// Extract preferences from a raw JSON document.
///
/// Unknown provider names are dropped one by one instead of discarding the
/// whole document.
fn parse_preferences(raw: &serde_json::Value) -> Preferences {
    let mut prefs = Preferences::default();

    let Some(obj) = raw.as_object() else {
        warn!("Preferences document is not a JSON object, ignoring it");
        return prefs;
    };

    if let Some(name) = obj.get("default_provider").and_then(|v| v.as_str()) {
        match name.parse::<Provider>() {
            Ok(provider) => prefs.default_provider = Some(provider),
            Err(e) => warn!("Ignoring default_provider: {}", e),
        }
    }

    if let Some(models) = obj.get("models").and_then(|v| v.as_object()) {
        for (name, model) in models {
            let (Ok(provider), Some(model)) = (name.parse::<Provider>(), model.as_str()) else {
                warn!("Ignoring preferred model entry '{}'", name);
                continue;
            };
            prefs.models.insert(provider, model.to_string());
        }
    }

    prefs
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
