//! Preferences: schema and the on-disk store.
//!
//! # Usage
//! ```no_run
//! use aiwand_core::config::PreferenceStore;
//!
//! let store = PreferenceStore::default();
//! let prefs = store.load();
//! println!("Default provider: {:?}", prefs.default_provider);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, PreferenceStore};
pub use schema::Preferences;
