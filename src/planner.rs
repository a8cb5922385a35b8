//! Planner contract: question (+ failure history) in, candidate intent out.
//!
//! The planner is an untrusted text generator, so its reply is modelled as a
//! tagged union and nothing reads intent fields before the tag is checked.

use crate::error::{QnaError, Result};
use crate::intent::{ErrorRecord, IntentModel};
use async_trait::async_trait;
use serde_json::Value;

/// Longest payload excerpt carried by a format fault.
pub const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerReply {
    Parsed(IntentModel),
    Malformed(MalformedEnvelope),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEnvelope {
    pub raw: String,
    pub reason: String,
}

impl PlannerReply {
    /// Decode raw planner output. Never fails: undecodable text becomes
    /// `Malformed`.
    pub fn decode(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return Self::malformed(raw, format!("not valid JSON: {}", e)),
        };
        if !value.is_object() {
            return Self::malformed(raw, "expected a JSON object");
        }
        match serde_json::from_value::<IntentModel>(value) {
            Ok(intent) => PlannerReply::Parsed(intent),
            Err(e) => Self::malformed(raw, format!("unexpected shape: {}", e)),
        }
    }

    fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        PlannerReply::Malformed(MalformedEnvelope {
            raw: raw.to_string(),
            reason: reason.into(),
        })
    }
}

impl MalformedEnvelope {
    /// Best-effort structural cleanup, then decode again.
    pub fn repaired(&self) -> PlannerReply {
        PlannerReply::decode(&clean_envelope(&self.raw))
    }

    /// Terminal fault for an envelope that could not be repaired.
    pub fn into_error(self) -> QnaError {
        QnaError::Format {
            message: format!("Planner response is not a valid query intent: {}", self.reason),
            snippet: snippet(&self.raw),
        }
    }
}

/// Strip Markdown fences, keep the outermost object and collapse raw line
/// breaks and tabs that sit inside JSON strings (typically a multi-line SQL
/// payload) into single spaces.
pub fn clean_envelope(raw: &str) -> String {
    let trimmed = raw.trim();
    let object = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };

    let mut cleaned = String::with_capacity(object.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut previous_was_break = false;
    for c in object.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if matches!(c, '\n' | '\r' | '\t') {
                if !previous_was_break {
                    cleaned.push(' ');
                }
                previous_was_break = true;
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        previous_was_break = false;
        cleaned.push(c);
    }
    cleaned
}

pub fn snippet(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Propose an intent for `question`. `history` holds earlier execution
    /// failures for the same question, oldest first (empty on attempt 1).
    async fn plan(&self, question: &str, history: &[ErrorRecord], default_limit: usize) -> Result<PlannerReply>;
}
