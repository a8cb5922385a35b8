//! Runtime settings read from the environment (and `.env` via dotenv).

use crate::error::{QnaError, Result};
use crate::security::{GuardPolicy, DEFAULT_SCHEMA, DEFAULT_TABLES};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_title: String,
    pub api_version: String,

    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,

    pub database_url: String,
    pub postgres_min_pool_size: u32,
    pub postgres_max_pool_size: u32,
    pub statement_timeout_ms: u64,

    pub max_rows: usize,
    pub max_attempts: u8,
    pub allowed_schema: String,
    pub allowed_tables: Vec<String>,

    pub server_addr: String,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                text("POSTGRES_USER", "admin"),
                text("POSTGRES_PASSWORD", ""),
                text("POSTGRES_HOST", "localhost"),
                parse::<u16>(get("POSTGRES_PORT"), "POSTGRES_PORT", 5432)?,
                text("POSTGRES_DATABASE", "dgtax"),
            ),
        };

        let allowed_tables: Vec<String> = match get("ALLOWED_TABLES") {
            Some(list) => list
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            None => DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
        };
        if allowed_tables.is_empty() {
            return Err(QnaError::Config("ALLOWED_TABLES must name at least one table".to_string()));
        }

        let max_rows = parse::<usize>(get("MAX_ROWS"), "MAX_ROWS", 200)?;
        if max_rows == 0 {
            return Err(QnaError::Config("MAX_ROWS must be greater than zero".to_string()));
        }
        let max_attempts = parse::<u8>(get("MAX_ATTEMPTS"), "MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(QnaError::Config("MAX_ATTEMPTS must be greater than zero".to_string()));
        }

        let min_pool = parse::<u32>(get("POSTGRES_MIN_POOL_SIZE"), "POSTGRES_MIN_POOL_SIZE", 1)?;
        let max_pool = parse::<u32>(get("POSTGRES_MAX_POOL_SIZE"), "POSTGRES_MAX_POOL_SIZE", 5)?;
        if max_pool == 0 || min_pool > max_pool {
            return Err(QnaError::Config(format!(
                "invalid pool bounds: min {} / max {}",
                min_pool, max_pool
            )));
        }

        Ok(Self {
            api_title: text("API_TITLE", "DGTAX QnA API"),
            api_version: text("API_VERSION", "0.1.0"),
            llm_base_url: text("LLM_BASE_URL", "http://localhost:11434/v1"),
            llm_model: text("LLM_MODEL", "llama3"),
            llm_api_key: get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            llm_timeout: Duration::from_secs(parse(get("LLM_TIMEOUT_SECONDS"), "LLM_TIMEOUT_SECONDS", 120)?),
            database_url,
            postgres_min_pool_size: min_pool,
            postgres_max_pool_size: max_pool,
            statement_timeout_ms: parse(get("STATEMENT_TIMEOUT_MS"), "STATEMENT_TIMEOUT_MS", 15_000)?,
            max_rows,
            max_attempts,
            allowed_schema: text("ALLOWED_SCHEMA", DEFAULT_SCHEMA),
            allowed_tables,
            server_addr: text("SERVER_ADDR", "0.0.0.0:8080"),
        })
    }

    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy::new(&self.allowed_schema, &self.allowed_tables)
    }
}

fn parse<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| QnaError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.max_rows, 200);
        assert_eq!(s.max_attempts, 3);
        assert_eq!(s.database_url, "postgres://admin:@localhost:5432/dgtax");
        assert!(s.guard_policy().is_table_allowed("empresa_socio"));
    }

    #[test]
    fn test_database_url_overrides_parts() {
        let s = settings(&[("DATABASE_URL", "postgres://ro@db/x"), ("POSTGRES_HOST", "ignored")]).unwrap();
        assert_eq!(s.database_url, "postgres://ro@db/x");
    }

    #[test]
    fn test_allowed_tables_list() {
        let s = settings(&[("ALLOWED_TABLES", " empresa , beneficios,,")]).unwrap();
        assert_eq!(s.allowed_tables, vec!["empresa", "beneficios"]);
        assert!(!s.guard_policy().is_table_allowed("empresa_socio"));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(settings(&[("MAX_ROWS", "lots")]), Err(QnaError::Config(_))));
        assert!(matches!(settings(&[("MAX_ATTEMPTS", "0")]), Err(QnaError::Config(_))));
        assert!(matches!(settings(&[("ALLOWED_TABLES", " , ")]), Err(QnaError::Config(_))));
    }

    #[test]
    fn test_api_key_falls_back_to_openai_variable() {
        let s = settings(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(s.llm_api_key.as_deref(), Some("sk-test"));
    }
}
