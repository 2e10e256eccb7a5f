//! Utility helpers: data directory lookup and string manipulation.

use std::path::PathBuf;

/// Get the AIWand data directory (e.g. `~/.aiwand/`).
pub fn get_data_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aiwand")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Whether a string is empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
