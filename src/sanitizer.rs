//! Parameter Sanitizer
//!
//! Drops dead parameters and makes sure a row cap is present. Appending the
//! cap is the only rewrite: the statement body proven by the safety gate is
//! never edited.

use crate::intent::{Advisory, Parameters};
use crate::security::lexical::has_keyword;
use serde_json::Value;
use sqlparser::keywords::Keyword;

#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub sql: String,
    pub parameters: Parameters,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone)]
pub struct ParameterSanitizer {
    default_limit: usize,
}

impl ParameterSanitizer {
    pub fn new(default_limit: usize) -> Self {
        Self { default_limit }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn sanitize(&self, sql: &str, parameters: &Parameters) -> Sanitized {
        let parameters: Parameters = parameters
            .iter()
            .filter(|(_, value)| !is_dead(value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut advisories = Vec::new();
        let sql = if has_keyword(sql, Keyword::LIMIT) {
            sql.to_string()
        } else {
            advisories.push(format!(
                "Default limit of {} rows applied automatically.",
                self.default_limit
            ));
            let body = sql.trim_end();
            // A trailing line comment would swallow the clause.
            let separator = match body.lines().last() {
                Some(line) if line.contains("--") => "\n",
                _ => " ",
            };
            format!("{}{}LIMIT {}", body, separator, self.default_limit)
        };

        Sanitized {
            sql,
            parameters,
            advisories,
        }
    }
}

/// A bound parameter that would silently change filter semantics.
fn is_dead(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "null" || s == "NULL",
        _ => false,
    }
}
