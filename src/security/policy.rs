//! Table and schema allow-list enforced by the safety gate.

use std::collections::BTreeSet;

pub const DEFAULT_SCHEMA: &str = "public";

pub const DEFAULT_TABLES: [&str; 5] = [
    "empresa",
    "beneficio_empresa",
    "beneficios",
    "empresa_atividade",
    "empresa_socio",
];

/// The single permitted schema plus the fixed set of readable tables.
/// Names are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    permitted_schema: String,
    allowed_tables: BTreeSet<String>,
}

impl GuardPolicy {
    pub fn new<I, S>(permitted_schema: &str, allowed_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            permitted_schema: permitted_schema.trim().to_lowercase(),
            allowed_tables: allowed_tables
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn permitted_schema(&self) -> &str {
        &self.permitted_schema
    }

    pub fn allowed_tables(&self) -> &BTreeSet<String> {
        &self.allowed_tables
    }

    /// Exact match: callers pass names already folded the way PostgreSQL
    /// folds them, so a quoted `"Public"` is not `public`.
    pub fn is_schema_permitted(&self, schema: &str) -> bool {
        schema == self.permitted_schema
    }

    pub fn is_table_allowed(&self, table: &str) -> bool {
        self.allowed_tables.contains(table)
    }
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA, DEFAULT_TABLES)
    }
}
