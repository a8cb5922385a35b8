use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why the safety gate refused a candidate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectReason {
    InvalidStatementCount,
    DisallowedStatementType,
    ForbiddenKeyword,
    ForbiddenSchemaAccess,
    TrailingSeparator,
    ParseFailure,
    UnsupportedSyntax,
    ForeignSchemaAccess,
    DisallowedTable,
    ForbiddenColumnExpression,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectReason::InvalidStatementCount => "InvalidStatementCount",
            RejectReason::DisallowedStatementType => "DisallowedStatementType",
            RejectReason::ForbiddenKeyword => "ForbiddenKeyword",
            RejectReason::ForbiddenSchemaAccess => "ForbiddenSchemaAccess",
            RejectReason::TrailingSeparator => "TrailingSeparator",
            RejectReason::ParseFailure => "ParseFailure",
            RejectReason::UnsupportedSyntax => "UnsupportedSyntax",
            RejectReason::ForeignSchemaAccess => "ForeignSchemaAccess",
            RejectReason::DisallowedTable => "DisallowedTable",
            RejectReason::ForbiddenColumnExpression => "ForbiddenColumnExpression",
        };
        write!(f, "{}", name)
    }
}

/// A rejection from the safety gate: the reason plus a human readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}: {detail}")]
pub struct ValidationError {
    pub reason: RejectReason,
    pub detail: String,
}

impl ValidationError {
    pub fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum QnaError {
    #[error("Query validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("{message} (payload: {snippet})")]
    Format { message: String, snippet: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QnaError>;
