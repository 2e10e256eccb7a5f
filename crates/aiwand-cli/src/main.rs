//! AIWand CLI entry point.
//!
//! # Commands
//!
//! - `aiwand setup` : choose default provider and model
//! - `aiwand status` : show providers, preferences, and the effective default
//! - `aiwand summarize [TEXT] [-f FILE]` : summarize text (stdin if neither given)
//! - `aiwand chat [-m MESSAGE]` : single message, or a REPL when omitted
//! - `aiwand generate PROMPT` : free-form generation
//! - `aiwand extract [CONTENT] [-l LINK]...` : structured extraction
//! - `aiwand classify -i INPUT -o OUTPUT` : grade a response

mod helpers;
mod repl;
mod setup;
mod status;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use aiwand::{AiWand, ChoiceScores, ClassifyRequest, ExtractRequest, Provider, SummaryStyle};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🪄 AIWand: summarize, chat, extract, and grade with OpenAI or Gemini
#[derive(Parser)]
#[command(name = "aiwand", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose the default provider and model
    Setup,

    /// Show providers, preferences, and the model in use
    Status,

    /// Summarize text
    Summarize {
        /// Text to summarize. Reads stdin when neither TEXT nor --file is given.
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Maximum summary length in words
        #[arg(long)]
        max_length: Option<u32>,

        /// concise, detailed, or bullet-points
        #[arg(short, long, default_value = "concise")]
        style: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Chat with the model (single message or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(short, long, default_value_t = 0.7)]
        temperature: f64,
    },

    /// Generate text from a prompt
    Generate {
        prompt: String,

        #[arg(long, default_value_t = 500)]
        max_tokens: u32,

        #[arg(short, long, default_value_t = 0.7)]
        temperature: f64,

        #[arg(long)]
        model: Option<String>,
    },

    /// Extract structured data from text, URLs, and files
    Extract {
        /// Inline content
        content: Option<String>,

        /// URL or file path to include (repeatable)
        #[arg(short, long = "link")]
        links: Vec<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(short, long, default_value_t = 0.7)]
        temperature: f64,
    },

    /// Grade a response against its input (and an expected answer)
    Classify {
        /// The question or prompt
        #[arg(short, long)]
        input: String,

        /// The response to grade
        #[arg(short, long)]
        output: String,

        /// Reference answer
        #[arg(short, long, default_value = "")]
        expected: String,

        /// Custom template with {input}, {output}, {expected}, {choices}
        #[arg(long)]
        template: Option<String>,

        /// Grade and score as LABEL=SCORE (repeatable; default CORRECT=1, INCORRECT=0)
        #[arg(short, long = "choice")]
        choices: Vec<ChoiceArg>,

        /// Skip step-by-step reasoning
        #[arg(long, default_value_t = false)]
        no_reasoning: bool,

        #[arg(long)]
        model: Option<String>,

        /// openai or gemini
        #[arg(long)]
        provider: Option<Provider>,

        /// Print the full response as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// A `LABEL=SCORE` pair from the command line.
#[derive(Clone, Debug, PartialEq)]
struct ChoiceArg {
    label: String,
    score: f64,
}

impl FromStr for ChoiceArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (label, score) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected LABEL=SCORE, got '{s}'"))?;
        let score = score
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid score '{score}' for '{label}'"))?;
        Ok(Self {
            label: label.trim().to_string(),
            score,
        })
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.logs);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            helpers::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let wand = AiWand::from_env();

    match command {
        Commands::Setup => setup::run(&wand),
        Commands::Status => status::run(&wand),
        Commands::Summarize {
            text,
            file,
            max_length,
            style,
            model,
        } => {
            let text = read_input(text, file)?;
            let summary = wand
                .summarize(&text, max_length, SummaryStyle::parse_lenient(&style), model.as_deref())
                .await?;
            println!("{summary}");
            Ok(())
        }
        Commands::Chat {
            message,
            model,
            temperature,
        } => match message {
            Some(message) => {
                info!("Processing single chat message");
                let reply = wand.chat(&message, &[], model.as_deref(), temperature).await?;
                helpers::print_reply(&reply);
                Ok(())
            }
            None => repl::run(&wand, model.as_deref(), temperature).await,
        },
        Commands::Generate {
            prompt,
            max_tokens,
            temperature,
            model,
        } => {
            let text = wand
                .generate_text(&prompt, max_tokens, temperature, model.as_deref())
                .await?;
            println!("{text}");
            Ok(())
        }
        Commands::Extract {
            content,
            links,
            model,
            temperature,
        } => {
            let mut request = ExtractRequest::new()
                .links(links.iter().map(|l| helpers::normalize_link(l)))
                .model(model)
                .temperature(temperature);
            if let Some(content) = content {
                request = request.content(content);
            }
            let response = wand.extract(request).await?;
            helpers::print_response(&response);
            Ok(())
        }
        Commands::Classify {
            input,
            output,
            expected,
            template,
            choices,
            no_reasoning,
            model,
            provider,
            json,
        } => {
            let mut request = ClassifyRequest::new(input, output)
                .expected(expected)
                .use_reasoning(!no_reasoning)
                .model(model)
                .provider(provider);
            if !choices.is_empty() {
                request = request.choice_scores(ChoiceScores::new(
                    choices.into_iter().map(|c| (c.label, c.score)),
                )?);
            }
            if let Some(template) = template {
                request = request.prompt_template(template);
            }

            let response = wand.classify_text(request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{} ({})", response.choice, response.score);
                if !response.reasoning.is_empty() {
                    println!("\n{}", response.reasoning);
                }
            }
            Ok(())
        }
    }
}

/// Text from the argument, a file, or stdin, in that order.
fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("aiwand=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
