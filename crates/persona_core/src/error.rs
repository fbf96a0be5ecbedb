//! Structural failures surfaced by the engine.
//!
//! Numeric edge cases (single-sample or zero-variance projection input) are
//! handled where they occur and never show up here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed persona definition or engine parameters. Fatal to the load.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two vectors that must share a dimensionality do not.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Orchestration needs at least two registered participants.
    #[error("insufficient participants: need at least 2, found {found}")]
    InsufficientParticipants { found: usize },
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = EngineError::dimension_mismatch("trigger 0", 3, 4);
        assert_eq!(
            e.to_string(),
            "dimension mismatch in trigger 0: expected 3, got 4"
        );
        let e = EngineError::InsufficientParticipants { found: 1 };
        assert!(e.to_string().contains("found 1"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        let e: anyhow::Error = EngineError::config("missing username").into();
        let back = e.downcast_ref::<EngineError>().unwrap();
        assert_eq!(back, &EngineError::config("missing username"));
    }
}
