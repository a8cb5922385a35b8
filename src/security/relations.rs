//! Parse-tree walk that collects every table a statement reads from.
//!
//! The walk is driven by the parser's derived visitor, so every relation is
//! reached wherever it sits: FROM lists, joins, derived tables, CTE bodies and
//! subqueries inside expressions. `TABLE name` bodies are checked at every
//! query level. FROM items and query bodies the gate does not understand stop
//! the walk with a rejection instead of being skipped.

use crate::error::{RejectReason, ValidationError};
use crate::security::policy::GuardPolicy;
use sqlparser::ast::{Ident, ObjectName, Query, SelectItem, SetExpr, Statement, TableFactor, Visit, Visitor};
use std::collections::BTreeSet;
use std::ops::ControlFlow;

pub(crate) struct RelationCollector<'a> {
    policy: &'a GuardPolicy,
    /// Names defined by the statement's own top-level WITH clause.
    local_names: BTreeSet<String>,
    referenced: BTreeSet<String>,
}

impl<'a> RelationCollector<'a> {
    pub(crate) fn new(policy: &'a GuardPolicy, query: &Query) -> Self {
        let local_names = query
            .with
            .as_ref()
            .map(|with| {
                with.cte_tables
                    .iter()
                    .map(|cte| fold(&cte.alias.name))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            policy,
            local_names,
            referenced: BTreeSet::new(),
        }
    }

    /// Walk the statement and return the base names of all referenced tables.
    pub(crate) fn collect(mut self, statement: &Statement) -> Result<BTreeSet<String>, ValidationError> {
        match statement.visit(&mut self) {
            ControlFlow::Break(rejection) => Err(rejection),
            ControlFlow::Continue(()) => Ok(self.referenced),
        }
    }
}

impl Visitor for RelationCollector<'_> {
    type Break = ValidationError;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        match statement {
            Statement::Query(_) => ControlFlow::Continue(()),
            other => ControlFlow::Break(ValidationError::new(
                RejectReason::DisallowedStatementType,
                format!("only queries are allowed, found `{}`", other),
            )),
        }
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        match table_factor {
            TableFactor::Table { args: None, .. }
            | TableFactor::Derived { .. }
            | TableFactor::NestedJoin { .. } => ControlFlow::Continue(()),
            TableFactor::Table { name, args: Some(_), .. } => ControlFlow::Break(ValidationError::new(
                RejectReason::UnsupportedSyntax,
                format!("table function `{}` is not allowed in FROM", name),
            )),
            other => ControlFlow::Break(ValidationError::new(
                RejectReason::UnsupportedSyntax,
                format!("unsupported FROM item `{}`", other),
            )),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.check_body(&query.body)
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let parts: Vec<String> = relation.0.iter().map(fold).collect();
        self.record(&parts, &relation.to_string())
    }
}

impl RelationCollector<'_> {
    /// Query bodies hold no `ObjectName` for `TABLE name`, so the visitor never
    /// reports it as a relation. Those names are checked here.
    fn check_body(&mut self, body: &SetExpr) -> ControlFlow<ValidationError> {
        match body {
            SetExpr::Select(select) if select.into.is_some() => ControlFlow::Break(ValidationError::new(
                RejectReason::UnsupportedSyntax,
                "SELECT ... INTO creates a table and is not allowed",
            )),
            SetExpr::Select(_) | SetExpr::Query(_) | SetExpr::Values(_) => ControlFlow::Continue(()),
            SetExpr::SetOperation { left, right, .. } => {
                self.check_body(left)?;
                self.check_body(right)
            }
            SetExpr::Table(table) => {
                // The parser drops quoting here; names are compared as written.
                let Some(name) = &table.table_name else {
                    return ControlFlow::Break(ValidationError::new(
                        RejectReason::UnsupportedSyntax,
                        format!("unsupported query body `{}`", body),
                    ));
                };
                let mut parts: Vec<String> = table.schema_name.iter().cloned().collect();
                parts.push(name.clone());
                self.record(&parts, &body.to_string())
            }
            other => ControlFlow::Break(ValidationError::new(
                RejectReason::DisallowedStatementType,
                format!("query body `{}` is not a read", other),
            )),
        }
    }

    /// `parts` are already case-folded identifier parts of one relation.
    fn record(&mut self, parts: &[String], shown: &str) -> ControlFlow<ValidationError> {
        match parts {
            [table] => {
                if !self.local_names.contains(table) {
                    self.referenced.insert(table.clone());
                }
                ControlFlow::Continue(())
            }
            [schema, table] if self.policy.is_schema_permitted(schema) => {
                self.referenced.insert(table.clone());
                ControlFlow::Continue(())
            }
            _ => ControlFlow::Break(ValidationError::new(
                RejectReason::ForeignSchemaAccess,
                format!(
                    "`{}` is outside the permitted schema `{}`",
                    shown,
                    self.policy.permitted_schema()
                ),
            )),
        }
    }
}

/// Unquoted identifiers fold to lowercase; quoted ones keep their exact text.
fn fold(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}

/// Select items of the outermost query body, descending through set
/// operations and parenthesised bodies but never into subqueries.
pub(crate) fn top_level_projection(query: &Query) -> Result<Vec<&SelectItem>, ValidationError> {
    let mut items = Vec::new();
    collect_projection(&query.body, &mut items)?;
    Ok(items)
}

fn collect_projection<'q>(body: &'q SetExpr, items: &mut Vec<&'q SelectItem>) -> Result<(), ValidationError> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                return Err(ValidationError::new(
                    RejectReason::UnsupportedSyntax,
                    "SELECT ... INTO creates a table and is not allowed",
                ));
            }
            items.extend(select.projection.iter());
            Ok(())
        }
        SetExpr::Query(query) => collect_projection(&query.body, items),
        SetExpr::SetOperation { left, right, .. } => {
            collect_projection(left, items)?;
            collect_projection(right, items)
        }
        SetExpr::Values(_) => Ok(()),
        other => Err(ValidationError::new(
            RejectReason::DisallowedStatementType,
            format!("query body `{}` is not a read", other),
        )),
    }
}
