//! Low-dimensional projection of a turn history for inspection.
//!
//! The projection works on an owned snapshot: the source history keeps its
//! full-dimensional embeddings. Results are not incremental; projecting a
//! longer history can move the coordinates of earlier turns.

use crate::ledger::TurnHistory;
use crate::pca::reduce;
use crate::turn::Turn;
use persona_core::config::ProjectionConfig;
use persona_core::{Embedding, EngineError, ProjectionMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryProjector {
    pub mode: ProjectionMode,
    pub target_dims: usize,
    pub variance_epsilon: f64,
}

impl Default for HistoryProjector {
    fn default() -> Self {
        Self::from(&ProjectionConfig::default())
    }
}

impl From<&ProjectionConfig> for HistoryProjector {
    fn from(cfg: &ProjectionConfig) -> Self {
        Self {
            mode: cfg.mode,
            target_dims: cfg.target_dims,
            variance_epsilon: cfg.variance_epsilon,
        }
    }
}

impl HistoryProjector {
    pub fn new(mode: ProjectionMode, target_dims: usize) -> Self {
        Self {
            mode,
            target_dims,
            ..Self::default()
        }
    }

    pub fn project(&self, history: &TurnHistory) -> Result<Vec<Turn>, EngineError> {
        self.project_turns(history.turns())
    }

    /// Project a slice of turns into a structurally identical owned copy.
    pub fn project_turns(&self, turns: &[Turn]) -> Result<Vec<Turn>, EngineError> {
        if self.target_dims == 0 {
            return Err(EngineError::config("projection target_dims must be > 0"));
        }
        let mut projected = turns.to_vec();
        if projected.is_empty() {
            return Ok(projected);
        }
        match self.mode {
            ProjectionMode::PerTurn => self.per_turn(&mut projected)?,
            ProjectionMode::WholeHistory => self.whole_history(&mut projected)?,
        }
        tracing::debug!(
            "Projected {} turn(s) to {} dims ({})",
            projected.len(),
            self.target_dims,
            self.mode
        );
        Ok(projected)
    }

    /// Each turn on its own: main embedding plus chunks as one matrix.
    fn per_turn(&self, turns: &mut [Turn]) -> Result<(), EngineError> {
        for turn in turns.iter_mut() {
            let mut rows: Vec<Embedding> = vec![std::mem::take(&mut turn.embedding)];
            let had_chunks = turn.chunked_embeddings.is_some();
            if let Some(chunks) = turn.chunked_embeddings.take() {
                rows.extend(chunks);
            }
            let context = format!("turn {}", turn.order);
            let mut reduced =
                reduce(&rows, self.target_dims, self.variance_epsilon, &context)?.rows;
            let chunks = reduced.split_off(1);
            turn.embedding = reduced.pop().unwrap_or_default();
            turn.chunked_embeddings = had_chunks.then_some(chunks);
        }
        Ok(())
    }

    /// One decomposition over every main embedding so trajectories share a
    /// basis; each turn's chunks get their own local decomposition.
    fn whole_history(&self, turns: &mut [Turn]) -> Result<(), EngineError> {
        let mains: Vec<Embedding> = turns
            .iter_mut()
            .map(|t| std::mem::take(&mut t.embedding))
            .collect();
        let reduction = reduce(&mains, self.target_dims, self.variance_epsilon, "history")?;

        for (turn, main) in turns.iter_mut().zip(reduction.rows) {
            turn.embedding = main;
            if let Some(chunks) = turn.chunked_embeddings.as_mut() {
                if chunks.is_empty() {
                    continue;
                }
                let context = format!("turn {} chunks", turn.order);
                *chunks = reduce(chunks, self.target_dims, self.variance_epsilon, &context)?.rows;
            }
        }
        Ok(())
    }
}

/// Project `history` with default epsilon.
pub fn project(
    history: &TurnHistory,
    mode: ProjectionMode,
    target_dims: usize,
) -> Result<Vec<Turn>, EngineError> {
    HistoryProjector::new(mode, target_dims).project(history)
}
