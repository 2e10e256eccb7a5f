//! Interactive chat REPL.
//!
//! Uses `rustyline` for line editing with persistent input history. The
//! conversation itself lives only in memory for the session.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use aiwand::{AiWand, Message};

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Clears the in-memory conversation.
const RESET_COMMAND: &str = "/reset";

/// Run the chat loop.
pub async fn run(wand: &AiWand, model: Option<&str>, temperature: f64) -> Result<()> {
    let selection = wand.resolver().select(None, model)?;
    helpers::print_banner(selection.provider.as_str(), &selection.model);

    let mut editor = create_editor()?;
    let mut history: Vec<Message> = Vec::new();

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }
        let _ = editor.add_history_entry(&input);

        if trimmed.eq_ignore_ascii_case(RESET_COMMAND) {
            history.clear();
            println!("(conversation cleared)\n");
            continue;
        }

        debug!(turns = history.len(), "Sending chat message");
        helpers::print_thinking();
        let result = wand.chat(trimmed, &history, model, temperature).await;
        helpers::clear_thinking();

        match result {
            Ok(reply) => {
                helpers::print_reply(&reply);
                record_turn(&mut history, trimmed, reply);
            }
            Err(e) => {
                eprintln!("\n❌ Error: {e}\n");
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Append a completed exchange to the conversation.
fn record_turn(history: &mut Vec<Message>, user: &str, reply: String) {
    history.push(Message::user(user));
    history.push(Message::assistant(reply));
}

fn create_editor() -> Result<DefaultEditor> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = history_path();
    if path.exists() {
        let _ = editor.load_history(&path);
        debug!("Loaded REPL history from {}", path.display());
    }
    Ok(editor)
}

fn save_history(editor: &mut DefaultEditor) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("Failed to save history: {e}");
    }
}

fn history_path() -> std::path::PathBuf {
    aiwand_core::utils::get_data_path()
        .join("history")
        .join("chat_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
