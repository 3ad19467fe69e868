//! Error types surfaced by the sync engine
//!
//! Only finalize and reorder failures reach callers. Malformed wire payloads
//! decode to empty defaults, and best-effort cleanup failures are logged.

use thiserror::Error;

/// Mandatory questions without an answer; raised before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mandatory questions unanswered: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

/// Edited questions that have no previously submitted answer to update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no existing answer id for questions: {}", .questions.join(", "))]
pub struct ConsistencyError {
    pub questions: Vec<String>,
}

/// Failure of a finalize attempt
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("failed to write answers: {0:#}")]
    Network(anyhow::Error),
}

/// Failure of a reorder gesture; local ordering has been rolled back
#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("element {0} is not part of this sibling set")]
    UnknownElement(String),

    #[error("position {index} is out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("failed to reorder {element_id}: {cause:#}")]
    Network {
        element_id: String,
        cause: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_questions() {
        let err = ValidationError {
            missing: vec!["q1".to_string(), "q3".to_string()],
        };
        assert_eq!(err.to_string(), "mandatory questions unanswered: q1, q3");
    }

    #[test]
    fn test_finalize_error_is_transparent() {
        let err: FinalizeError = ConsistencyError {
            questions: vec!["q2".to_string()],
        }
        .into();
        assert_eq!(err.to_string(), "no existing answer id for questions: q2");
    }

    #[test]
    fn test_network_error_includes_cause() {
        let err = FinalizeError::Network(anyhow::anyhow!("connection reset"));
        assert_eq!(err.to_string(), "failed to write answers: connection reset");
    }
}
