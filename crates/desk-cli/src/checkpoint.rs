//! Conversation checkpoints keyed by thread
//!
//! Stores are append-only: a thread's history can be read in full or extended,
//! never rewritten.

use anyhow::{Context, Result};
use desk_core::ChatMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::debug;

/// Conversation thread identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new("1")
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Persisted conversation state per thread
pub trait CheckpointStore: Send + Sync {
    /// Full history of a thread, oldest first; unknown threads are empty
    fn load(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>>;

    /// Append messages to the end of a thread
    fn append(&self, thread: &ThreadId, messages: &[ChatMessage]) -> Result<()>;

    /// Number of messages in a thread
    fn len(&self, thread: &ThreadId) -> Result<usize> {
        Ok(self.load(thread)?.len())
    }
}

/// Volatile store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<ThreadId, Vec<ChatMessage>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>> {
        Ok(self.threads.read().get(thread).cloned().unwrap_or_default())
    }

    fn append(&self, thread: &ThreadId, messages: &[ChatMessage]) -> Result<()> {
        self.threads
            .write()
            .entry(thread.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    fn len(&self, thread: &ThreadId) -> Result<usize> {
        Ok(self.threads.read().get(thread).map_or(0, Vec::len))
    }
}

/// One JSON Lines file per thread under a directory
#[derive(Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create checkpoint directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn thread_path(&self, thread: &ThreadId) -> PathBuf {
        let file: String = thread
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.jsonl", file))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, thread: &ThreadId) -> Result<Vec<ChatMessage>> {
        let path = self.thread_path(thread);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open checkpoint {}", path.display()))?;

        let mut messages = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context("Failed to read checkpoint")?;
            if line.trim().is_empty() {
                continue;
            }
            let msg: ChatMessage = serde_json::from_str(&line)
                .with_context(|| format!("Corrupt checkpoint {} at line {}", path.display(), idx + 1))?;
            messages.push(msg);
        }

        Ok(messages)
    }

    fn append(&self, thread: &ThreadId, messages: &[ChatMessage]) -> Result<()> {
        let path = self.thread_path(thread);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open checkpoint {}", path.display()))?;

        let mut buf = String::new();
        for msg in messages {
            buf.push_str(&serde_json::to_string(msg).context("Failed to serialize message")?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes()).context("Failed to write checkpoint")?;

        debug!(thread = %thread, appended = messages.len(), "Checkpoint updated");
        Ok(())
    }
}
