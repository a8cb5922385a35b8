//! Error Classifier
//!
//! Sorts attempt failures into retryable and terminal classes.

use crate::error::QnaError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    /// The statement passed the gate but the engine refused it. Carries the
    /// engine text verbatim; this is the only retryable class.
    ExecutionError(String),
    /// The safety gate rejected the statement.
    ValidationError,
    /// The planner reply could not be turned into an intent.
    FormatError,
    /// Any other collaborator fault (LLM transport, configuration, ...).
    CollaboratorFault(String),
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::ExecutionError(_))
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::ExecutionError(msg) => write!(f, "ExecutionError({})", msg),
            FailureClass::ValidationError => write!(f, "ValidationError"),
            FailureClass::FormatError => write!(f, "FormatError"),
            FailureClass::CollaboratorFault(msg) => write!(f, "CollaboratorFault({})", msg),
        }
    }
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &QnaError) -> FailureClass {
        match error {
            QnaError::Execution(message) => FailureClass::ExecutionError(message.clone()),
            QnaError::Validation(_) => FailureClass::ValidationError,
            QnaError::Format { .. } => FailureClass::FormatError,
            other => FailureClass::CollaboratorFault(other.to_string()),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
