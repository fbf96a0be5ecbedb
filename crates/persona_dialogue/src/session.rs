//! One conversation: a persona, its ledger, its sentiment tallies and the
//! orchestrator, composed into a single owned context. Nothing here is
//! shared between sessions.

use crate::orchestrator::TurnOrchestrator;
use crate::participant::{ChatEntry, Participant};
use anyhow::{Context, Result};
use persona_core::{
    embed_with_chunks, Embedder, EngineConfig, EngineError, Persona, ProjectionMode, Role,
    SentimentAggregator, SentimentClassifier, TriggerFiring,
};
use persona_memory::{HistoryProjector, SessionRecord, Turn, TurnDraft, TurnHistory};
use std::sync::Arc;

/// What one processed message produced.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub turn: Turn,
    pub fired: Vec<TriggerFiring>,
}

pub struct Session {
    persona: Persona,
    orchestrator: TurnOrchestrator,
    sentiment: SentimentAggregator,
    history: TurnHistory,
    embedder: Arc<dyn Embedder>,
    classifier: Arc<dyn SentimentClassifier>,
    config: EngineConfig,
}

impl Session {
    pub fn new(
        persona: Persona,
        embedder: Arc<dyn Embedder>,
        classifier: Arc<dyn SentimentClassifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            persona,
            orchestrator: TurnOrchestrator::new(),
            sentiment: SentimentAggregator::new(),
            history: TurnHistory::new(),
            embedder,
            classifier,
            config,
        }
    }

    pub fn add_participant(&mut self, participant: impl Participant + 'static) -> usize {
        self.orchestrator.add_participant(participant)
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn persona_mut(&mut self) -> &mut Persona {
        &mut self.persona
    }

    pub fn history(&self) -> &TurnHistory {
        &self.history
    }

    pub fn sentiment(&self) -> &SentimentAggregator {
        &self.sentiment
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        self.orchestrator.transcript()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Advance one turn and route the new line through triggers, sentiment
    /// and the ledger. On error the transcript, cursor, mental state, counters
    /// and ledger are all left as they were.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let entry = self.orchestrator.generate().await?;
        let outcome = self.process(&entry)?;
        self.orchestrator.commit(entry);
        Ok(outcome)
    }

    /// Run exactly `num_turns` steps. Fails before the first one if fewer
    /// than two participants are registered.
    pub async fn run(&mut self, num_turns: usize) -> Result<Vec<StepOutcome>> {
        self.orchestrator.ensure_ready()?;
        tracing::info!(
            "Running {} turn(s) between {:?}",
            num_turns,
            self.orchestrator
                .roles()
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
        );
        let mut outcomes = Vec::with_capacity(num_turns);
        for _ in 0..num_turns {
            outcomes.push(self.step().await?);
        }
        Ok(outcomes)
    }

    /// Record a narrator line in the transcript and the ledger.
    pub fn narrate(&mut self, text: impl Into<String>) -> Result<StepOutcome> {
        let entry = ChatEntry::new(Role::Narrator, text);
        let outcome = self.process(&entry)?;
        self.orchestrator.narrate(entry.message);
        Ok(outcome)
    }

    fn process(&mut self, entry: &ChatEntry) -> Result<StepOutcome> {
        // Every fallible call happens before the first mutation.
        let (embedding, chunks) = embed_with_chunks(
            self.embedder.as_ref(),
            &entry.message,
            self.config.embedding.chunk_words,
        )
        .with_context(|| format!("Failed to embed message from '{}'", entry.role))?;

        // The persona reacts to what others say, not to itself.
        let fired = if entry.role == self.persona.role() {
            Vec::new()
        } else {
            self.persona
                .triggers()
                .matches(&embedding, self.config.triggers.threshold)?
        };

        let probs = self
            .classifier
            .classify(&entry.message)
            .with_context(|| format!("Failed to classify message from '{}'", entry.role))?;

        for f in &fired {
            self.persona.update_mental_state(&f.changes);
            tracing::info!(
                "{} trigger '{}' fired at distance {:.4}",
                self.persona.username(),
                f.phrase,
                f.distance
            );
        }
        let reading = self.sentiment.record(&entry.role, probs);

        let draft = TurnDraft::new(
            entry.role.clone(),
            entry.message.clone(),
            embedding,
            chunks,
            &reading,
        )
        .with_mental_state(self.persona.mental_state().clone());
        let turn = self.history.push(draft).clone();

        tracing::debug!(
            "Turn {} [{}] {:?} (compound {:.3})",
            turn.order,
            turn.role,
            turn.sentiment,
            turn.sentiment_scores.compound
        );
        Ok(StepOutcome { turn, fired })
    }

    /// Project a snapshot of the ledger with the configured mode and width.
    pub fn project(&self) -> Result<Vec<Turn>, EngineError> {
        HistoryProjector::from(&self.config.projection).project(&self.history)
    }

    pub fn project_with(
        &self,
        mode: ProjectionMode,
        target_dims: usize,
    ) -> Result<Vec<Turn>, EngineError> {
        let projector = HistoryProjector {
            mode,
            target_dims,
            ..HistoryProjector::from(&self.config.projection)
        };
        projector.project(&self.history)
    }

    /// Serializable snapshot for persistence.
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            persona_name: self.persona.username().to_string(),
            mental_state: self.persona.mental_state().clone(),
            turns: self.history.snapshot(),
        }
    }
}
