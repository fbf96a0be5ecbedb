//! Round-robin turn driver.
//!
//! Holds the ordered participants, a cursor, and the shared transcript. It
//! never touches mental state or sentiment; [`crate::Session`] wires those in.

use crate::participant::{ChatEntry, Participant};
use anyhow::{Context, Result};
use persona_core::{EngineError, Role};

pub const MIN_PARTICIPANTS: usize = 2;

#[derive(Default)]
pub struct TurnOrchestrator {
    participants: Vec<Box<dyn Participant>>,
    cursor: usize,
    transcript: Vec<ChatEntry>,
}

impl TurnOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant and return its turn-order index.
    pub fn add_participant(&mut self, participant: impl Participant + 'static) -> usize {
        self.participants.push(Box::new(participant));
        self.participants.len() - 1
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn roles(&self) -> Vec<Role> {
        self.participants.iter().map(|p| p.role()).collect()
    }

    /// Role of whoever speaks next.
    pub fn current_role(&self) -> Option<Role> {
        self.participants.get(self.cursor).map(|p| p.role())
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.participants.len() < MIN_PARTICIPANTS {
            return Err(EngineError::InsufficientParticipants {
                found: self.participants.len(),
            });
        }
        Ok(())
    }

    /// Ask the current participant for its next line without recording it.
    ///
    /// Nothing changes until the entry is handed to [`commit`](Self::commit).
    pub async fn generate(&self) -> Result<ChatEntry> {
        self.ensure_ready()?;
        let speaker = &self.participants[self.cursor];
        let role = speaker.role();
        let message = speaker
            .generate_message(&self.transcript)
            .await
            .with_context(|| format!("Participant '{}' failed to generate a message", role))?;
        Ok(ChatEntry::new(role, message))
    }

    /// Record a line produced by [`generate`](Self::generate) and pass the
    /// turn to the next participant.
    pub fn commit(&mut self, entry: ChatEntry) {
        self.transcript.push(entry);
        if !self.participants.is_empty() {
            self.cursor = (self.cursor + 1) % self.participants.len();
        }
    }

    /// Let the current participant speak, record the line, move the cursor.
    pub async fn advance(&mut self) -> Result<ChatEntry> {
        let entry = self.generate().await?;
        self.commit(entry.clone());
        Ok(entry)
    }

    /// Call [`advance`](Self::advance) exactly `num_turns` times.
    ///
    /// Checks the participant count before the first turn, so a bad setup
    /// runs nothing.
    pub async fn run(&mut self, num_turns: usize) -> Result<Vec<ChatEntry>> {
        self.ensure_ready()?;
        let mut produced = Vec::with_capacity(num_turns);
        for _ in 0..num_turns {
            produced.push(self.advance().await?);
        }
        Ok(produced)
    }

    /// Append a narrator line without moving the cursor.
    pub fn narrate(&mut self, text: impl Into<String>) -> ChatEntry {
        let entry = ChatEntry::new(Role::Narrator, text);
        self.transcript.push(entry.clone());
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ScriptedParticipant;

    fn two_party() -> TurnOrchestrator {
        let mut o = TurnOrchestrator::new();
        o.add_participant(ScriptedParticipant::new("P0", ["zero"]));
        o.add_participant(ScriptedParticipant::new("P1", ["one"]));
        o
    }

    #[tokio::test]
    async fn test_round_robin_order() {
        let mut o = two_party();
        let produced = o.run(4).await.unwrap();
        let roles: Vec<String> = produced.iter().map(|e| e.role.to_string()).collect();
        assert_eq!(roles, vec!["P0", "P1", "P0", "P1"]);
        assert_eq!(o.transcript().len(), 4);
        assert_eq!(o.current_role(), Some(Role::participant("P0")));
    }

    #[tokio::test]
    async fn test_insufficient_participants_runs_nothing() {
        let mut o = TurnOrchestrator::new();
        o.add_participant(ScriptedParticipant::new("Alone", ["hi"]));
        let err = o.run(3).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::InsufficientParticipants { found: 1 })
        );
        assert!(o.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_empty_orchestrator_advance_fails() {
        let mut o = TurnOrchestrator::new();
        assert!(o.advance().await.is_err());
        assert_eq!(o.current_role(), None);
    }

    #[tokio::test]
    async fn test_generate_leaves_state_until_commit() {
        let mut o = two_party();
        let entry = o.generate().await.unwrap();
        assert_eq!(entry.role, Role::participant("P0"));
        assert!(o.transcript().is_empty());
        assert_eq!(o.current_role(), Some(Role::participant("P0")));

        o.commit(entry);
        assert_eq!(o.transcript().len(), 1);
        assert_eq!(o.current_role(), Some(Role::participant("P1")));
    }

    #[tokio::test]
    async fn test_three_participants_wrap() {
        let mut o = two_party();
        o.add_participant(ScriptedParticipant::new("P2", ["two"]));
        let produced = o.run(5).await.unwrap();
        let msgs: Vec<&str> = produced.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["zero", "one", "two", "zero", "one"]);
    }

    #[tokio::test]
    async fn test_narration_does_not_move_cursor() {
        let mut o = two_party();
        o.narrate("P1 approaches P0.");
        let first = o.advance().await.unwrap();
        assert_eq!(first.role, Role::participant("P0"));
        assert_eq!(o.transcript()[0].role, Role::Narrator);
        assert_eq!(o.transcript().len(), 2);
    }
}
