//! CLI commands implementation

use anyhow::{Context, Result};
use desk_core::{ChatMessage, ChatModel, Config, ContentBlock, OpenAiClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::agent::{AgentConfig, AgentLoop, AgentState};
use crate::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, ThreadId};
use crate::image;
use crate::tools::builtin::create_default_registry;
use crate::tools::router::ToolRouter;

// ANSI color codes
pub const GREEN: &str = "\x1b[92m";
pub const RED: &str = "\x1b[91m";
pub const YELLOW: &str = "\x1b[93m";
pub const CYAN: &str = "\x1b[96m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";

/// Text sent ahead of an attached image
pub const IMAGE_INTRO: &str =
    "This is image uploaded by user who needs support. Get information from image and continue with chat";

/// Overrides given on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub model: Option<String>,
    pub thread: Option<String>,
    pub checkpoint_dir: Option<PathBuf>,
    pub max_iterations: Option<usize>,
}

/// Load configuration and apply command-line overrides
pub fn load_config(opts: &RunOptions) -> Result<Config> {
    let mut config = match &opts.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env();
            config
        }
        None => Config::load().context("Failed to load desk.toml")?,
    };

    if let Some(model) = &opts.model {
        config.openai.model = model.clone();
    }
    if let Some(thread) = &opts.thread {
        config.agent.thread_id = thread.clone();
    }
    if let Some(max) = opts.max_iterations {
        config.agent.max_iterations = max;
    }

    Ok(config)
}

/// Build the message for one submission
///
/// An attached image goes first, behind a short instruction; empty
/// submissions produce nothing.
pub fn compose_message(text: &str, image_uri: Option<String>) -> Option<ChatMessage> {
    let mut blocks = Vec::new();

    if let Some(uri) = image_uri {
        blocks.push(ContentBlock::text(IMAGE_INTRO));
        blocks.push(ContentBlock::image_url(uri));
    }

    let text = text.trim();
    if !text.is_empty() {
        blocks.push(ContentBlock::text(text));
    }

    if blocks.is_empty() {
        None
    } else {
        Some(ChatMessage::user(blocks))
    }
}

/// An agent bound to one conversation thread
pub struct Desk {
    agent: AgentLoop,
    thread: ThreadId,
}

impl Desk {
    /// Wire the agent from configuration, talking to the configured OpenAI endpoint
    pub fn from_config(config: &Config, checkpoint_dir: Option<&Path>) -> Result<Self> {
        let client = OpenAiClient::new(&config.openai)?;
        let summarizer = client.with_model(config.search.summary_model.clone());
        debug!(model = client.model(), summary_model = summarizer.model(), "Model clients ready");

        let store: Arc<dyn CheckpointStore> = match checkpoint_dir {
            Some(dir) => Arc::new(FileCheckpointStore::new(dir)?),
            None => Arc::new(MemoryCheckpointStore::new()),
        };

        Self::with_parts(config, Arc::new(client), Arc::new(summarizer), store)
    }

    pub fn with_parts(
        config: &Config,
        model: Arc<dyn ChatModel>,
        summarizer: Arc<dyn ChatModel>,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self> {
        let registry = create_default_registry(config, summarizer)?;
        debug!(tools = ?registry.list_names(), "Tools registered");

        let mut agent_config = AgentConfig::default().with_max_iterations(config.agent.max_iterations);
        if let Some(prompt) = &config.agent.system_prompt {
            agent_config = agent_config.with_system_prompt(prompt.clone());
        }

        Ok(Self {
            agent: AgentLoop::new(model, ToolRouter::new(registry), store, agent_config),
            thread: ThreadId::new(config.agent.thread_id.clone()),
        })
    }

    pub fn thread(&self) -> &ThreadId {
        &self.thread
    }

    /// Number of messages persisted for this thread
    pub fn history_len(&self) -> Result<usize> {
        self.agent.store().len(&self.thread)
    }

    /// Run one submission to completion; `None` when there was nothing to send
    pub async fn submit(&self, text: &str, image_path: Option<&Path>) -> Result<Option<AgentState>> {
        let image_uri = image_path.map(image::load_data_uri).transpose()?;

        let message = match compose_message(text, image_uri) {
            Some(m) => m,
            None => return Ok(None),
        };

        let state = self.agent.run(&self.thread, message).await?;
        Ok(Some(state))
    }
}

/// One-shot submission (non-interactive)
pub async fn ask(opts: &RunOptions, prompt: &str, image_path: Option<&Path>, json_output: bool) -> Result<()> {
    let config = load_config(opts)?;
    let desk = Desk::from_config(&config, opts.checkpoint_dir.as_deref())?;

    let state = match desk.submit(prompt, image_path).await? {
        Some(state) => state,
        None => anyhow::bail!("Nothing to send: provide a prompt or --image"),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&state_json(desk.thread(), &state))?);
        return Ok(());
    }

    if let Some(response) = &state.final_response {
        println!("{}", response);
    }
    if let Some(error) = &state.error {
        eprintln!("{}Error:{} {}", RED, RESET, error);
    }

    Ok(())
}

fn state_json(thread: &ThreadId, state: &AgentState) -> serde_json::Value {
    serde_json::json!({
        "thread": thread.as_str(),
        "response": state.final_response,
        "error": state.error,
        "finished": state.finished,
        "iterations": state.iteration,
        "tool_calls": state.tool_calls,
    })
}
