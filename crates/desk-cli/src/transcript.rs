//! Local chat log shown in the REPL
//!
//! Display only; the agent's history lives in the checkpoint store and is
//! untouched by `clear`.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// One rendered line of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub user: String,
    pub text: String,
    /// Wall-clock time, `HH:MM:SS`
    pub time: String,
}

impl TranscriptEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}: {}", self.time, self.user, self.text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line stamped with the current local time
    pub fn push(&mut self, user: impl Into<String>, text: impl Into<String>) {
        let time = Local::now().format("%H:%M:%S").to_string();
        self.push_at(user, text, time);
    }

    pub fn push_at(&mut self, user: impl Into<String>, text: impl Into<String>, time: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            user: user.into(),
            text: text.into(),
            time: time.into(),
        });
    }

    /// Lines, newest first
    pub fn render(&self) -> Vec<String> {
        self.entries.iter().rev().map(TranscriptEntry::render).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
