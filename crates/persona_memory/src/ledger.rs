//! Append-only turn ledger for one session.

use crate::turn::{Turn, TurnDraft};
use chrono::Utc;
use persona_core::euclidean_distance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnHistory {
    turns: Vec<Turn>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its 1-based order.
    pub fn append(&mut self, draft: TurnDraft) -> u64 {
        self.push(draft).order
    }

    /// Append a turn and return the stored record.
    pub fn push(&mut self, draft: TurnDraft) -> &Turn {
        let order = self.turns.len() as u64 + 1;

        if let Some(chunks) = &draft.chunked_embeddings {
            for (idx, chunk) in chunks.iter().enumerate() {
                match euclidean_distance(&draft.embedding, chunk) {
                    Ok(d) => tracing::debug!(
                        "Turn {}: distance between main embedding and chunk {}: {:.4}",
                        order,
                        idx,
                        d
                    ),
                    Err(e) => {
                        tracing::debug!("Turn {}: chunk {} not comparable ({})", order, idx, e)
                    }
                }
            }
        }

        self.turns.push(Turn {
            order,
            timestamp: Utc::now(),
            role: draft.role,
            message: draft.message,
            embedding: draft.embedding,
            chunked_embeddings: draft.chunked_embeddings,
            sentiment: draft.sentiment,
            sentiment_scores: draft.sentiment_scores,
            role_sentiment_counts: draft.role_sentiment_counts,
            overall_sentiment_counts: draft.overall_sentiment_counts,
            mental_state: draft.mental_state,
        });
        &self.turns[self.turns.len() - 1]
    }

    pub fn size(&self) -> usize {
        self.turns.len()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Look up a turn by its 1-based order.
    pub fn get(&self, order: u64) -> Option<&Turn> {
        order
            .checked_sub(1)
            .and_then(|i| self.turns.get(i as usize))
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Owned copy of every turn, for projection or export.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }
}

impl<'a> IntoIterator for &'a TurnHistory {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
