//! `aiwand setup`: interactive wizard for the default provider and model.
//!
//! Menus are numbered in registry order; Enter keeps the current choice.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use aiwand::{AiWand, Provider};
use aiwand_providers::registry;

/// What the user typed at a numbered menu.
#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Keep,
    Pick(usize),
    Invalid,
}

fn parse_answer(input: &str, len: usize) -> Answer {
    let input = input.trim();
    if input.is_empty() {
        return Answer::Keep;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Answer::Pick(n - 1),
        _ => Answer::Invalid,
    }
}

/// Menu lines with `(current)` / `(recommended)` markers.
fn menu_lines(items: &[&str], current: Option<usize>, recommended: Option<usize>) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut line = format!("  {}. {item}", i + 1);
            if current == Some(i) {
                line.push_str(" (current)");
            }
            if recommended == Some(i) {
                line.push_str(" (recommended)");
            }
            line
        })
        .collect()
}

/// Prompt until a valid answer. `None` means the user cancelled.
fn prompt_choice(editor: &mut DefaultEditor, len: usize, current: Option<usize>) -> Result<Option<usize>> {
    let prompt = format!("\nEnter choice (1-{len}) or press Enter to keep current: ");
    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match (parse_answer(&line, len), current) {
            (Answer::Pick(i), _) | (Answer::Keep, Some(i)) => return Ok(Some(i)),
            _ => println!("{}", "Invalid choice. Please try again.".red()),
        }
    }
}

/// Run the setup wizard.
pub fn run(wand: &AiWand) -> Result<()> {
    println!();
    println!("{}", "🪄 AIWand Setup".cyan().bold());
    println!();

    let resolver = wand.resolver();
    let available: Vec<Provider> = resolver
        .available_providers()
        .into_iter()
        .filter_map(|(provider, has_key)| has_key.then_some(provider))
        .collect();

    if available.is_empty() {
        println!("  {}", "No API keys found!".red().bold());
        println!();
        println!("  Please set up your API keys first:");
        println!("    OPENAI_API_KEY=your_openai_key");
        println!("    GEMINI_API_KEY=your_gemini_key");
        println!();
        println!("  Then run `aiwand setup` again.");
        println!();
        return Ok(());
    }

    let store = resolver.store();
    let mut prefs = store.load();

    println!("  {}", "Current settings:".bold());
    match prefs.default_provider {
        Some(provider) => {
            println!("    Provider: {provider}");
            if let Some(model) = prefs.preferred_model(provider) {
                println!("    Model:    {model}");
            }
        }
        None => println!("    {}", "No preferences set".dimmed()),
    }

    let mut editor = DefaultEditor::new()?;

    // Provider
    println!();
    println!("{}", "🔧 Choose your default provider:".bold());
    let names: Vec<&str> = available
        .iter()
        .map(|p| registry::spec(*p).display_name)
        .collect();
    let current_provider = prefs
        .default_provider
        .and_then(|p| available.iter().position(|a| *a == p));
    for line in menu_lines(&names, current_provider, None) {
        println!("{line}");
    }
    let Some(provider_index) = prompt_choice(&mut editor, available.len(), current_provider)? else {
        println!("\n{}", "Setup cancelled.".yellow());
        return Ok(());
    };
    let provider = available[provider_index];

    // Model
    let spec = registry::spec(provider);
    let models = spec.models;
    let current_model = prefs
        .preferred_model(provider)
        .and_then(|raw| registry::resolve_enum(provider, raw))
        .unwrap_or(spec.default_model);
    let current_index = models.iter().position(|m| *m == current_model);
    let recommended_index = models.iter().position(|m| *m == spec.default_model);

    println!();
    println!(
        "{}",
        format!("🤖 Choose your default model for {}:", spec.display_name).bold()
    );
    for line in menu_lines(models, current_index, recommended_index) {
        println!("{line}");
    }
    let Some(model_index) = prompt_choice(&mut editor, models.len(), current_index)? else {
        println!("\n{}", "Setup cancelled.".yellow());
        return Ok(());
    };
    let model = models[model_index];

    prefs.set_default(provider, model);
    store.save(&prefs)?;

    println!();
    println!("  {} Preferences saved to {}", "✓".green(), store.path().display());
    println!("    Provider: {provider}");
    println!("    Model:    {model}");
    println!();

    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
