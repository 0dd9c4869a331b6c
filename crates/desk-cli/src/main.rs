//! desk: service desk chat assistant
//!
//! Answers technical questions with web search, and raises ServiceNow
//! incidents and knowledge articles through a tool-calling agent.

mod agent;
mod checkpoint;
mod commands;
mod image;
mod repl;
#[cfg(test)]
mod test_support;
mod tools;
mod transcript;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::commands::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "desk")]
#[command(about = "Service desk chat assistant", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to desk.toml (default: search current directory and parents)
    #[arg(short, long, global = true, env = "DESK_CONFIG")]
    config: Option<PathBuf>,

    /// Chat model to use (overrides config)
    #[arg(short, long, global = true, env = "DESK_MODEL")]
    model: Option<String>,

    /// Conversation thread id
    #[arg(short, long, global = true, env = "DESK_THREAD")]
    thread: Option<String>,

    /// Persist threads as JSON Lines under this directory
    #[arg(long, global = true, env = "DESK_CHECKPOINT_DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Maximum model turns per submission
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start interactive chat REPL
    Chat,

    /// One-shot submission (non-interactive)
    Ask {
        /// The message to send
        prompt: Vec<String>,

        /// Attach an image (png, jpg, jpeg, gif, webp)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            config: self.config.clone(),
            model: self.model.clone(),
            thread: self.thread.clone(),
            checkpoint_dir: self.checkpoint_dir.clone(),
            max_iterations: self.max_iterations,
        }
    }
}

/// Load KEY=VALUE pairs from `.env` without overriding the environment
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return;
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim().trim_start_matches("export ").trim();
            let val = val.trim().trim_matches('"').trim_matches('\'');
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, val);
            }
        }
    }
}

fn main() -> Result<()> {
    // Before the runtime starts any threads
    load_dotenv();

    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let opts = cli.run_options();
    runtime.block_on(async move {
        match cli.command {
            Some(Commands::Ask { prompt, image, json }) => {
                commands::ask(&opts, &prompt.join(" "), image.as_deref(), json).await
            }
            Some(Commands::Chat) | None => repl::run(opts).await,
        }
    })
}
