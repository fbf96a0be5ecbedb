//! Trigger matching: embedded phrases that perturb the mental state when an
//! incoming message lands close enough to them.

use crate::embedding::{euclidean_distance, Embedder, Embedding};
use crate::error::EngineError;
use crate::mental_state::{Changes, MentalState};
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRIGGER_THRESHOLD: f32 = 0.5;

/// A configured phrase embedding and the deltas it applies. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerDescriptor {
    phrase: String,
    embedding: Embedding,
    changes: Changes,
}

impl TriggerDescriptor {
    pub fn new(phrase: impl Into<String>, embedding: Embedding, changes: Changes) -> Self {
        Self {
            phrase: phrase.into(),
            embedding,
            changes,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn changes(&self) -> &Changes {
        &self.changes
    }
}

/// One trigger that fired on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFiring {
    /// Position of the trigger in definition order.
    pub index: usize,
    pub phrase: String,
    pub distance: f32,
    pub changes: Changes,
}

/// The static, ordered trigger list of one persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerSet {
    triggers: Vec<TriggerDescriptor>,
}

impl TriggerSet {
    pub fn new(triggers: Vec<TriggerDescriptor>) -> Self {
        Self { triggers }
    }

    /// Embed each `(phrase, changes)` pair once with `embedder`.
    ///
    /// Every resulting vector must match `embedder.dimensions()`.
    pub fn embed<'a, I>(specs: I, embedder: &dyn Embedder) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Changes)>,
    {
        let expected = embedder.dimensions();
        let mut triggers = Vec::new();
        for (index, (phrase, changes)) in specs.into_iter().enumerate() {
            let embedding = embedder.embed(phrase)?;
            if embedding.len() != expected {
                return Err(EngineError::dimension_mismatch(
                    format!("trigger {} embedding", index),
                    expected,
                    embedding.len(),
                )
                .into());
            }
            triggers.push(TriggerDescriptor::new(phrase, embedding, changes.clone()));
        }
        Ok(Self { triggers })
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerDescriptor> {
        self.triggers.iter()
    }

    /// Find the triggers within `threshold` of `embedding`, in definition order.
    ///
    /// Read-only. Any trigger whose dimensionality differs from the incoming
    /// embedding is a `DimensionMismatch`.
    pub fn matches(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Vec<TriggerFiring>, EngineError> {
        let mut fired = Vec::new();
        for (index, trigger) in self.triggers.iter().enumerate() {
            if trigger.embedding.len() != embedding.len() {
                return Err(EngineError::dimension_mismatch(
                    format!("trigger {} ('{}')", index, trigger.phrase),
                    trigger.embedding.len(),
                    embedding.len(),
                ));
            }
            let distance = euclidean_distance(embedding, &trigger.embedding)?;
            if distance < threshold {
                tracing::debug!(
                    "Trigger activated (distance: {:.4}). Applying changes: {:?}",
                    distance,
                    trigger.changes
                );
                fired.push(TriggerFiring {
                    index,
                    phrase: trigger.phrase.clone(),
                    distance,
                    changes: trigger.changes.clone(),
                });
            } else {
                tracing::debug!("Trigger not activated (distance: {:.4}).", distance);
            }
        }
        Ok(fired)
    }

    /// Match and apply every firing trigger's deltas to `state`, in order.
    ///
    /// Matching completes before any delta is applied, so a mismatch leaves
    /// `state` untouched.
    pub fn check(
        &self,
        embedding: &[f32],
        threshold: f32,
        state: &mut MentalState,
    ) -> Result<Vec<TriggerFiring>, EngineError> {
        let fired = self.matches(embedding, threshold)?;
        for firing in &fired {
            state.update(&firing.changes);
        }
        Ok(fired)
    }
}
