//! Named placeholder binding.
//!
//! Planner statements use `:name` placeholders. Postgres only understands
//! positional `$n`, so each distinct name is numbered in order of first use.
//! Placeholders are located with the SQL tokenizer; text inside string
//! literals, quoted identifiers, comments and `::` casts is left alone.

use crate::error::{QnaError, Result};
use crate::intent::Parameters;
use serde_json::Value;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    /// Values for `$1..$n`, in order.
    pub values: Vec<Value>,
}

pub fn bind_named(sql: &str, parameters: &Parameters) -> Result<BoundStatement> {
    let tokens = Tokenizer::new(&PostgreSqlDialect {}, sql)
        .tokenize_with_location()
        .map_err(|e| QnaError::Execution(format!("statement could not be tokenized: {}", e)))?;
    let offsets = SourceOffsets::new(sql);

    let mut out = String::with_capacity(sql.len());
    let mut copied_up_to = 0;
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut values = Vec::new();

    for (i, current) in tokens.iter().enumerate() {
        if let Token::Placeholder(raw) = &current.token {
            return Err(QnaError::Execution(format!(
                "placeholder {} is not supported, use named parameters like :name",
                raw
            )));
        }
        if current.token != Token::Colon {
            continue;
        }
        let Some(next) = tokens.get(i + 1) else { continue };
        let Token::Word(word) = &next.token else { continue };

        let start = offsets.byte_offset(&current.location);
        if offsets.byte_offset(&next.location) != start + 1 {
            continue;
        }
        let end = tokens
            .get(i + 2)
            .map(|after| offsets.byte_offset(&after.location))
            .unwrap_or(sql.len());

        let name = word.value.clone();
        let position = match positions.get(&name) {
            Some(position) => *position,
            None => {
                let value = parameters.get(&name).cloned().ok_or_else(|| {
                    QnaError::Execution(format!(
                        "parameter :{} is referenced by the query but no value was supplied",
                        name
                    ))
                })?;
                values.push(value);
                positions.insert(name, values.len());
                values.len()
            }
        };

        out.push_str(&sql[copied_up_to..start]);
        out.push_str(&format!("${}", position));
        copied_up_to = end;
    }
    out.push_str(&sql[copied_up_to..]);

    Ok(BoundStatement { sql: out, values })
}

/// Maps tokenizer locations (1-based line and character column) to byte
/// offsets in the source text.
struct SourceOffsets<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceOffsets<'a> {
    fn new(sql: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { sql, line_starts }
    }

    fn byte_offset(&self, location: &Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.sql.len();
        };
        let column = (location.column as usize).saturating_sub(1);
        self.sql[line_start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(self.sql.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_names_become_positions_in_first_use_order() {
        let bound = bind_named(
            "SELECT * FROM beneficio_empresa WHERE uf = :uf AND periodo_apuracao >= :ano OR uf = :uf",
            &params(json!({"ano": 2023, "uf": "SP", "unused": 1})),
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM beneficio_empresa WHERE uf = $1 AND periodo_apuracao >= $2 OR uf = $1"
        );
        assert_eq!(bound.values, vec![json!("SP"), json!(2023)]);
    }

    #[test]
    fn test_literals_casts_and_comments_are_untouched() {
        let sql = "SELECT ':uf', valor::numeric -- :uf\nFROM empresa WHERE razao_social = :nome";
        let bound = bind_named(sql, &params(json!({"nome": "ACME", "uf": "SP"}))).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT ':uf', valor::numeric -- :uf\nFROM empresa WHERE razao_social = $1"
        );
        assert_eq!(bound.values, vec![json!("ACME")]);
    }

    #[test]
    fn test_multibyte_text_before_placeholder() {
        let bound = bind_named(
            "SELECT 'São Paulo' AS cidade FROM empresa WHERE uf = :uf",
            &params(json!({"uf": "SP"})),
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT 'São Paulo' AS cidade FROM empresa WHERE uf = $1");
    }

    #[test]
    fn test_missing_parameter_is_an_execution_error() {
        let err = bind_named("SELECT * FROM empresa WHERE uf = :uf", &Parameters::new()).unwrap_err();
        match err {
            QnaError::Execution(message) => assert!(message.contains(":uf")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
