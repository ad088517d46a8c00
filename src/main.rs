use anyhow::{anyhow, Result};
use chatwidget_core::{ChatError, ChatSession, Config, Pacing, ResolutionOutcome, TrainingCorpus};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod repl;

#[derive(Parser)]
#[command(name = "chatwidget")]
#[command(about = "Answer chat messages from a FAQ/knowledge corpus, with completion and canned fallbacks")]
struct Cli {
    /// Config file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively
    Chat {
        /// Corpus JSON file
        #[arg(short, long)]
        corpus: Option<PathBuf>,
        /// Show replies immediately instead of pacing them
        #[arg(long)]
        no_delay: bool,
    },
    /// Resolve a single message and exit
    Ask {
        /// The message to answer
        message: String,
        /// Corpus JSON file
        #[arg(short, long)]
        corpus: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { corpus, no_delay } => {
            let pacing = if no_delay {
                Pacing::Instant
            } else {
                Pacing::Interactive
            };
            repl::run(&config, corpus, pacing).await?
        }
        Commands::Ask { message, corpus } => ask(&config, &message, corpus.as_deref()).await?,
        Commands::Config => show_config(&config, cli.config.as_deref())?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let env_key = std::env::var(chatwidget_core::config::API_KEY_ENV).ok();
            Ok(Config::load_from(path)?.with_api_key_override(env_key))
        }
        None => Config::load(),
    }
}

/// Read a corpus file; without one the session runs on an empty corpus.
pub async fn load_corpus(path: Option<&Path>) -> Result<TrainingCorpus> {
    let Some(path) = path else {
        return Ok(TrainingCorpus::default());
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read corpus {:?}: {}", path, e))?;
    let load = TrainingCorpus::from_json_str(&content)?;

    if !load.skipped.is_empty() {
        eprintln!(
            "{}",
            format!("⚠️  Skipped {} malformed corpus entries", load.skipped.len()).yellow()
        );
    }
    debug!(
        faqs = load.corpus.faqs.len(),
        knowledge = load.corpus.knowledge.len(),
        "corpus loaded"
    );
    Ok(load.corpus)
}

async fn ask(config: &Config, message: &str, corpus_path: Option<&Path>) -> Result<()> {
    let corpus = load_corpus(corpus_path).await?;
    let mut session = ChatSession::new(config).with_pacing(Pacing::Instant);

    match session.resolve(message, &corpus).await {
        Ok(outcome) => print_reply(&outcome),
        Err(warning) => print_warning(&warning),
    }
    Ok(())
}

fn show_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::get_config_path()?,
    };

    println!("{} {}", "Config file:".bold(), path.display());
    println!(
        "{} {} messages / {}ms, cooldown {}ms",
        "Rate limit:".bold(),
        config.rate_limit.max_messages,
        config.rate_limit.window_ms,
        config.rate_limit.cooldown_ms
    );
    println!(
        "{} {} chars, thinking {}-{}ms",
        "Replies:".bold(),
        config.response.max_length,
        config.response.min_thinking_ms,
        config.response.max_thinking_ms
    );

    let status = if config.completion.is_configured() {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };
    println!(
        "{} {} ({} via {}, key {}, timeout {}ms)",
        "Completion:".bold(),
        status,
        config.completion.model,
        config.completion.endpoint,
        config.completion.masked_key(),
        config.completion.timeout_ms
    );
    Ok(())
}

pub fn print_reply(outcome: &ResolutionOutcome) {
    println!("{} {}", format!("[{}]", outcome.source).dimmed(), outcome.text);
}

pub fn print_warning(warning: &ChatError) {
    println!("{}", format!("⚠️  {}", warning).yellow());
}
