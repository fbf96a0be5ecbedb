//! Conversation participants: anything that can produce the next line given
//! the transcript so far.

use anyhow::{bail, Result};
use async_trait::async_trait;
use persona_core::Role;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One line of the shared chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub message: String,
}

impl ChatEntry {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }
}

/// The message-generation collaborator, bound to one speaker.
#[async_trait]
pub trait Participant: Send + Sync {
    fn role(&self) -> Role;

    /// Produce the next message given the full transcript so far.
    async fn generate_message(&self, history: &[ChatEntry]) -> Result<String>;
}

/// Replays a fixed list of lines in order, wrapping around at the end.
#[derive(Debug)]
pub struct ScriptedParticipant {
    role: Role,
    lines: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedParticipant {
    pub fn new<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: Role::participant(name),
            lines: lines.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of lines produced so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Participant for ScriptedParticipant {
    fn role(&self) -> Role {
        self.role.clone()
    }

    async fn generate_message(&self, _history: &[ChatEntry]) -> Result<String> {
        if self.lines.is_empty() {
            bail!("scripted participant '{}' has no lines", self.role);
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self.lines[i % self.lines.len()].clone())
    }
}
