//! Execution Gateway - contract between the repair loop and the data engine.

use crate::error::Result;
use crate::intent::{Parameters, Row};
use async_trait::async_trait;

/// Rows returned by one bounded fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRows {
    /// At most `max_rows` rows, in engine order.
    pub rows: Vec<Row>,
    /// True when the engine had more than `max_rows` rows to give.
    pub limit_applied: bool,
}

impl FetchedRows {
    /// Keep the first `max_rows` of up to `max_rows + 1` fetched rows.
    pub fn from_overfetch(mut rows: Vec<Row>, max_rows: usize) -> Self {
        let limit_applied = rows.len() > max_rows;
        rows.truncate(max_rows);
        Self { rows, limit_applied }
    }
}

/// Executes a statement the safety gate has already accepted.
///
/// Implementations must fetch at most `max_rows + 1` rows and report any
/// engine fault as `QnaError::Execution` carrying the engine's own message.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn fetch(&self, sql: &str, parameters: &Parameters) -> Result<FetchedRows>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64) -> Row {
        json!({ "id": id }).as_object().cloned().unwrap()
    }

    #[test]
    fn test_overfetch_detects_truncation() {
        let fetched = FetchedRows::from_overfetch((0..4).map(row).collect(), 3);
        assert_eq!(fetched.rows.len(), 3);
        assert!(fetched.limit_applied);

        let fetched = FetchedRows::from_overfetch((0..3).map(row).collect(), 3);
        assert_eq!(fetched.rows.len(), 3);
        assert!(!fetched.limit_applied);
    }
}
