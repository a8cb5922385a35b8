//! Token-level checks: statement boundaries, leading keyword, forbidden words.
//!
//! Statement splitting and the leading-keyword test run over the SQL tokenizer
//! so that comments and string literals can not hide a separator or fake a
//! keyword. The forbidden-word scan deliberately runs over the raw text: a
//! write keyword anywhere, even inside a literal or comment, is a rejection.

use crate::error::{RejectReason, ValidationError};
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::BTreeSet;

lazy_static! {
    static ref FORBIDDEN_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|truncate|grant|revoke)\b"
    )
    .expect("forbidden keyword pattern");
    static ref SYSTEM_CATALOGS: Regex =
        Regex::new(r"(?i)\b(pg_\w*|information_schema|pg_catalog)\b").expect("catalog pattern");
}

pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>, ValidationError> {
    Tokenizer::new(&PostgreSqlDialect {}, sql)
        .tokenize()
        .map_err(|e| {
            ValidationError::new(
                RejectReason::ParseFailure,
                format!("statement could not be tokenized: {}", e),
            )
        })
}

/// Whitespace and comments carry no meaning for the gate.
fn is_meaningful(token: &Token) -> bool {
    !matches!(token, Token::Whitespace(_) | Token::EOF)
}

/// Number of non-empty statements between `;` separators.
pub(crate) fn statement_count(tokens: &[Token]) -> usize {
    tokens
        .split(|t| *t == Token::SemiColon)
        .filter(|segment| segment.iter().any(is_meaningful))
        .count()
}

/// True when the first meaningful token is an unquoted SELECT or WITH.
pub(crate) fn starts_with_read_keyword(tokens: &[Token]) -> bool {
    match tokens.iter().find(|t| is_meaningful(t)) {
        Some(Token::Word(word)) => {
            word.quote_style.is_none() && matches!(word.keyword, Keyword::SELECT | Keyword::WITH)
        }
        _ => false,
    }
}

/// True when `keyword` appears as an unquoted word outside literals and comments.
pub(crate) fn has_keyword(sql: &str, keyword: Keyword) -> bool {
    match tokenize(sql) {
        Ok(tokens) => tokens.iter().any(|t| {
            matches!(t, Token::Word(word) if word.quote_style.is_none() && word.keyword == keyword)
        }),
        Err(_) => false,
    }
}

pub(crate) fn leading_token(tokens: &[Token]) -> String {
    tokens
        .iter()
        .find(|t| is_meaningful(t))
        .map(|t| t.to_string())
        .unwrap_or_default()
}

pub(crate) fn has_trailing_separator(tokens: &[Token]) -> bool {
    matches!(
        tokens.iter().rev().find(|t| is_meaningful(t)),
        Some(Token::SemiColon)
    )
}

/// Distinct, lowercased write/DDL keywords found as whole words.
pub(crate) fn forbidden_keywords(sql: &str) -> BTreeSet<String> {
    FORBIDDEN_KEYWORDS
        .find_iter(sql)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Distinct, lowercased system catalog identifiers found as whole words.
pub(crate) fn system_catalog_references(sql: &str) -> BTreeSet<String> {
    SYSTEM_CATALOGS
        .find_iter(sql)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(sql: &str) -> Vec<Token> {
        tokenize(sql).unwrap()
    }

    #[test]
    fn test_separator_inside_literal_does_not_split() {
        assert_eq!(statement_count(&tokens("SELECT ';' FROM empresa")), 1);
        assert_eq!(statement_count(&tokens("SELECT 1; SELECT 2")), 2);
        assert_eq!(statement_count(&tokens("SELECT 1;")), 1);
        assert_eq!(statement_count(&tokens("  -- nothing\n")), 0);
    }

    #[test]
    fn test_leading_keyword_skips_comments() {
        assert!(starts_with_read_keyword(&tokens(
            "/* hint */\n  -- note\n select 1"
        )));
        assert!(starts_with_read_keyword(&tokens("WITH x AS (SELECT 1) SELECT * FROM x")));
        assert!(!starts_with_read_keyword(&tokens("(SELECT 1)")));
        assert!(!starts_with_read_keyword(&tokens("\"select\" 1")));
    }

    #[test]
    fn test_trailing_separator_ignores_trailing_comment() {
        assert!(has_trailing_separator(&tokens("SELECT 1; -- done")));
        assert!(!has_trailing_separator(&tokens("SELECT 1")));
    }

    #[test]
    fn test_forbidden_keywords_are_whole_words() {
        assert!(forbidden_keywords("SELECT updated_at FROM empresa").is_empty());
        assert_eq!(
            forbidden_keywords("select 1 WHERE x = 'DrOp'").into_iter().collect::<Vec<_>>(),
            vec!["drop".to_string()]
        );
    }

    #[test]
    fn test_catalog_prefix_matches_any_pg_name() {
        let found = system_catalog_references("SELECT * FROM pg_tables JOIN information_schema.columns c ON true");
        assert!(found.contains("pg_tables"));
        assert!(found.contains("information_schema"));
        assert!(system_catalog_references("SELECT xpg_value FROM empresa").is_empty());
    }
}
