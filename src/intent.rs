//! Data contracts shared by the planner, the safety gate, the gateway and the
//! HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Named parameters proposed by the planner. Keys are unique by construction.
pub type Parameters = BTreeMap<String, Value>;

/// One result row, column name to value, in projection order.
pub type Row = Map<String, Value>;

/// Free-text note about an automatic adjustment, surfaced to the caller.
pub type Advisory = String;

/// Candidate statement proposed by the planner for a single attempt.
///
/// `sql` is untrusted until the safety gate has accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentModel {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sql: String,

    #[serde(default, alias = "parametros", deserialize_with = "null_as_empty")]
    pub parameters: Parameters,

    #[serde(default, alias = "justificativa")]
    pub rationale: Option<String>,

    /// Conventionally 0..=1, not enforced.
    #[serde(default, alias = "confianca")]
    pub confidence: Option<f64>,
}

impl IntentModel {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A failed execution attempt, kept as feedback for the next planner call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub attempt_index: u8,
    pub message: String,
}

/// Outcome of the attempt that finally succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub sql: String,
    pub parameters: Parameters,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub limit_applied: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    #[serde(alias = "pergunta")]
    pub question: String,

    /// Optional caller metadata (user, channel, preset filters). Not used by
    /// the safety gate.
    #[serde(default, alias = "contexto")]
    pub context: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub original_question: String,
    pub composed_answer: String,
    pub query_summary: ExecutionResult,
    pub advisories: Vec<Advisory>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_accepts_original_field_names() {
        let intent: IntentModel = serde_json::from_value(json!({
            "sql": "SELECT 1",
            "parametros": {"uf": "SP"},
            "justificativa": "because",
            "confianca": 0.7
        }))
        .unwrap();

        assert_eq!(intent.parameters.get("uf"), Some(&json!("SP")));
        assert_eq!(intent.rationale.as_deref(), Some("because"));
        assert_eq!(intent.confidence, Some(0.7));
    }

    #[test]
    fn test_null_sql_and_parameters_decode_as_empty() {
        let intent: IntentModel =
            serde_json::from_value(json!({"sql": null, "parameters": null})).unwrap();
        assert!(intent.sql.is_empty());
        assert!(intent.parameters.is_empty());
    }
}
