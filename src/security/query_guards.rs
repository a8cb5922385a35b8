//! Query Guards
//!
//! Fail-closed safety gate for planner-generated SQL. A candidate statement is
//! accepted only when every check passes, in this order:
//!
//! 1. exactly one non-empty statement
//! 2. leading keyword is SELECT or WITH
//! 3. no write/DDL keyword, no system catalog name, no trailing separator
//! 4. every referenced table is in the permitted schema and on the allow-list
//! 5. every projected expression uses only the allowed character class

use crate::error::{RejectReason, ValidationError};
use crate::security::lexical;
use crate::security::policy::GuardPolicy;
use crate::security::relations::{top_level_projection, RelationCollector};
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::{SelectItem, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;

lazy_static! {
    static ref COLUMN_EXPRESSION: Regex =
        Regex::new(r#"^[\p{L}\p{N}_.'"()\s<>=!+\-*/:%]+$"#).expect("column expression pattern");
}

/// A statement the gate accepted, with the tables it reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub sql: String,
    pub tables: BTreeSet<String>,
}

/// Structural checker for candidate SQL. Holds only the immutable policy, so
/// the same input always yields the same verdict.
#[derive(Debug, Clone, Default)]
pub struct SafetyValidator {
    policy: GuardPolicy,
}

impl SafetyValidator {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn validate(&self, sql: &str) -> Result<ValidatedQuery, ValidationError> {
        let tokens = lexical::tokenize(sql)?;

        let count = lexical::statement_count(&tokens);
        if count != 1 {
            return Err(ValidationError::new(
                RejectReason::InvalidStatementCount,
                format!("expected exactly one statement, found {}", count),
            ));
        }

        if !lexical::starts_with_read_keyword(&tokens) {
            return Err(ValidationError::new(
                RejectReason::DisallowedStatementType,
                format!(
                    "only SELECT/WITH statements are allowed, found `{}`",
                    lexical::leading_token(&tokens)
                ),
            ));
        }

        let keywords = lexical::forbidden_keywords(sql);
        if !keywords.is_empty() {
            return Err(ValidationError::new(
                RejectReason::ForbiddenKeyword,
                format!("forbidden keywords: {}", join(&keywords)),
            ));
        }

        let catalogs = lexical::system_catalog_references(sql);
        if !catalogs.is_empty() {
            return Err(ValidationError::new(
                RejectReason::ForbiddenSchemaAccess,
                format!("system catalog access: {}", join(&catalogs)),
            ));
        }

        if lexical::has_trailing_separator(&tokens) {
            return Err(ValidationError::new(
                RejectReason::TrailingSeparator,
                "statement must not end with a separator",
            ));
        }

        let statement = parse_single(sql)?;
        let query = match &statement {
            Statement::Query(query) => query,
            other => {
                return Err(ValidationError::new(
                    RejectReason::DisallowedStatementType,
                    format!("only queries are allowed, found `{}`", other),
                ))
            }
        };
        let projection = top_level_projection(query)?;

        let tables = RelationCollector::new(&self.policy, query).collect(&statement)?;
        let offenders: BTreeSet<String> = tables
            .iter()
            .filter(|t| !self.policy.is_table_allowed(t))
            .cloned()
            .collect();
        if !offenders.is_empty() {
            return Err(ValidationError::new(
                RejectReason::DisallowedTable,
                format!("tables outside the allow-list: {}", join(&offenders)),
            ));
        }

        let rejected_columns: Vec<String> = projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => None,
                other => {
                    let text = other.to_string();
                    (!COLUMN_EXPRESSION.is_match(&text)).then_some(text)
                }
            })
            .collect();
        if !rejected_columns.is_empty() {
            return Err(ValidationError::new(
                RejectReason::ForbiddenColumnExpression,
                format!("column expressions not allowed: {}", rejected_columns.join(" | ")),
            ));
        }

        Ok(ValidatedQuery {
            sql: sql.to_string(),
            tables,
        })
    }
}

fn parse_single(sql: &str) -> Result<Statement, ValidationError> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|e| {
        ValidationError::new(
            RejectReason::ParseFailure,
            format!("statement could not be parsed: {}", e),
        )
    })?;

    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(ValidationError::new(
            RejectReason::InvalidStatementCount,
            format!("expected exactly one statement, parsed {}", n),
        )),
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}
