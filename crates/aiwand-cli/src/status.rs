//! `aiwand status`: providers, saved preferences, and the effective default.

use anyhow::Result;
use colored::Colorize;

use aiwand::AiWand;
use aiwand_providers::registry;

/// Run the status command.
pub fn run(wand: &AiWand) -> Result<()> {
    let resolver = wand.resolver();
    let store = resolver.store();

    println!();
    println!("{}", "🪄 AIWand Status".cyan().bold());
    println!();

    // Providers
    println!("  {}", "Providers:".bold());
    let available = resolver.available_providers();
    for (provider, has_key) in &available {
        let spec = registry::spec(*provider);
        let status = if *has_key {
            format!("{} ({} set)", "✓".green(), spec.env_key)
        } else {
            format!("{}", format!("· {} not set", spec.env_key).dimmed())
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    // Preferences
    println!();
    let config_path = store.path();
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    let prefs = store.load();
    if prefs.is_empty() {
        println!("  {:<18} {}", "Preferences:".bold(), "none".dimmed());
    } else {
        let default = prefs
            .default_provider
            .map(|p| p.to_string())
            .unwrap_or_else(|| "(none)".into());
        println!("  {:<18} {}", "Default provider:".bold(), default);
        for (provider, model) in &prefs.models {
            println!("    {:<20} {}", provider.as_str(), model);
        }
    }

    // Effective selection
    println!();
    if !available.iter().any(|(_, has_key)| *has_key) {
        println!(
            "  {}",
            "No API keys configured. Set OPENAI_API_KEY or GEMINI_API_KEY.".red()
        );
    } else {
        let selection = resolver.preferred_selection()?;
        println!(
            "  {:<18} {} · {}",
            "Currently using:".bold(),
            selection.provider,
            selection.model.green()
        );
    }

    println!();
    println!("  {}", "Run `aiwand setup` to change preferences.".dimmed());
    println!();

    Ok(())
}
