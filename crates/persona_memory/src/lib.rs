//! # Persona Memory
//!
//! The per-session record of a conversation and its derived views:
//!
//! - [`TurnHistory`]: append-only ledger of [`Turn`]s, 1-based order, no gaps
//! - [`HistoryProjector`]: principal-component projection of the ledger's
//!   embeddings to a few dimensions, per turn or across the whole history
//! - [`export`]: JSON persistence of a session

pub mod export;
pub mod ledger;
pub mod pca;
pub mod projection;
pub mod turn;

pub use export::{export_session, load_record, ExportPaths, SessionRecord};
pub use ledger::TurnHistory;
pub use pca::{Reduction, ReductionPath};
pub use projection::{project, HistoryProjector};
pub use turn::{Turn, TurnDraft};
