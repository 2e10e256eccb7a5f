//! Shared CLI helpers: path expansion, output printing, error reporting.

use std::path::PathBuf;

use colored::Colorize;

use aiwand::{AiError, Response};

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// The CLI-facing form of an `extract` link: local paths get `~` expanded.
pub fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    if trimmed.starts_with('~') {
        expand_tilde(trimmed).display().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Print an assistant reply under the AIWand header.
pub fn print_reply(reply: &str) {
    println!();
    println!("{}", "🪄 AIWand".cyan().bold());
    if reply.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{reply}");
    }
    println!();
}

/// Print a dispatch result: text as-is, structured values as pretty JSON.
pub fn print_response(response: &Response) {
    match response {
        Response::Text(text) => println!("{text}"),
        Response::Structured(value) => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        ),
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(provider: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🪄 AIWand chat".cyan().bold(), version.dimmed());
    println!("{}", format!("{provider} · {model}").dimmed());
    println!("{}", "Type a message, or \"exit\" to quit.".dimmed());
    println!();
}

/// Print a "thinking" placeholder on stderr.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Remediation text for an error, if it wraps an [`AiError`] that has one.
pub fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AiError>())
        .and_then(AiError::hint)
}

/// Report a failed command on stderr, without a backtrace.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {err}", "Error:".red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("  {} {cause}", "caused by:".dimmed());
    }
    if let Some(hint) = hint_for(err) {
        eprintln!("{} {hint}", "hint:".yellow().bold());
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
