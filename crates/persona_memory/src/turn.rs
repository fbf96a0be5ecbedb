use chrono::{DateTime, Utc};
use persona_core::{
    Embedding, MentalState, Role, SentimentCounts, SentimentLabel, SentimentReading,
    SentimentScores,
};
use serde::{Deserialize, Serialize};

/// One recorded line of the conversation. Owned by the ledger and never
/// modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based position in the ledger.
    pub order: u64,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub message: String,
    pub embedding: Embedding,
    /// Sub-segment embeddings for long messages, in message order.
    pub chunked_embeddings: Option<Vec<Embedding>>,
    pub sentiment: SentimentLabel,
    pub sentiment_scores: SentimentScores,
    /// Speaker's counter as it stood right after this turn.
    pub role_sentiment_counts: SentimentCounts,
    /// Global counter as it stood right after this turn.
    pub overall_sentiment_counts: SentimentCounts,
    /// Persona mental state after this turn was processed, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mental_state: Option<MentalState>,
}

/// Everything the caller supplies for a new turn; the ledger adds `order`
/// and `timestamp`.
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub role: Role,
    pub message: String,
    pub embedding: Embedding,
    pub chunked_embeddings: Option<Vec<Embedding>>,
    pub sentiment: SentimentLabel,
    pub sentiment_scores: SentimentScores,
    pub role_sentiment_counts: SentimentCounts,
    pub overall_sentiment_counts: SentimentCounts,
    pub mental_state: Option<MentalState>,
}

impl TurnDraft {
    /// Assemble a draft from a sentiment reading taken for this message.
    pub fn new(
        role: Role,
        message: impl Into<String>,
        embedding: Embedding,
        chunked_embeddings: Option<Vec<Embedding>>,
        reading: &SentimentReading,
    ) -> Self {
        Self {
            role,
            message: message.into(),
            embedding,
            chunked_embeddings,
            sentiment: reading.label,
            sentiment_scores: reading.scores,
            role_sentiment_counts: reading.role_counts,
            overall_sentiment_counts: reading.overall_counts,
            mental_state: None,
        }
    }

    pub fn with_mental_state(mut self, state: MentalState) -> Self {
        self.mental_state = Some(state);
        self
    }
}
