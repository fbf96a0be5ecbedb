//! # Persona Core
//!
//! Domain types and pure logic for a simulated persona:
//!
//! - [`MentalState`]: bounded integer attributes, clamped to `[0, 10]`
//! - [`TriggerSet`]: embedded phrases that fire state deltas on close matches
//! - [`SentimentAggregator`]: compound-score bucketing, global and per role
//! - [`Persona`]: configuration loaded from JSON plus the live mental state
//!
//! The embedding encoder and sentiment classifier are collaborators behind
//! the [`Embedder`] and [`SentimentClassifier`] traits.

pub mod config;
pub mod embedding;
pub mod error;
pub mod mental_state;
pub mod persona;
pub mod role;
pub mod sentiment;
pub mod trigger;

pub use config::{EmbeddingBackend, EngineConfig, ProjectionMode};
pub use embedding::{
    chunk_message, embed_with_chunks, euclidean_distance, Embedder, Embedding, HashingEmbedder,
};
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedEncoder;
pub use error::EngineError;
pub use mental_state::{Changes, MentalState, DEFAULT_ATTRIBUTES, STATE_MAX, STATE_MIN};
pub use persona::{Persona, PersonaDefinition, TriggerSpec};
pub use role::{Role, NARRATOR_LABEL};
pub use sentiment::{
    ClassProbabilities, LexiconClassifier, SentimentAggregator, SentimentClassifier,
    SentimentCounts, SentimentLabel, SentimentReading, SentimentScores,
};
pub use trigger::{TriggerDescriptor, TriggerFiring, TriggerSet, DEFAULT_TRIGGER_THRESHOLD};
