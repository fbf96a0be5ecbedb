//! # Persona Dialogue
//!
//! Drives a conversation turn by turn. [`TurnOrchestrator`] only sequences
//! participants; [`Session`] composes it with the persona's triggers, the
//! sentiment aggregator and the turn ledger.

pub mod orchestrator;
pub mod participant;
pub mod session;

pub use orchestrator::{TurnOrchestrator, MIN_PARTICIPANTS};
pub use participant::{ChatEntry, Participant, ScriptedParticipant};
pub use session::{Session, StepOutcome};
