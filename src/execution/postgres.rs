//! PostgreSQL execution gateway.
//!
//! Every fetch runs in its own read-only transaction with a local statement
//! timeout, and the transaction is always rolled back.

use crate::error::{QnaError, Result};
use crate::execution::gateway::{ExecutionGateway, FetchedRows};
use crate::execution::placeholders::bind_named;
use crate::intent::{Parameters, Row};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::QueryScalar;
use sqlx::Postgres;
use tracing::{debug, warn};

type JsonRowQuery<'q> = QueryScalar<'q, Postgres, Value, PgArguments>;

pub struct PostgresGateway {
    pool: PgPool,
    max_rows: usize,
    statement_timeout_ms: u64,
}

impl PostgresGateway {
    pub fn new(pool: PgPool, max_rows: usize, statement_timeout_ms: u64) -> Self {
        Self {
            pool,
            max_rows,
            statement_timeout_ms,
        }
    }
}

#[async_trait]
impl ExecutionGateway for PostgresGateway {
    async fn fetch(&self, sql: &str, parameters: &Parameters) -> Result<FetchedRows> {
        let bound = bind_named(sql, parameters)?;

        // The newline keeps a trailing line comment from swallowing the wrapper.
        let wrapped = format!(
            "SELECT row_to_json(q) FROM (\n{}\n) AS q LIMIT {}",
            bound.sql,
            self.max_rows + 1
        );
        debug!("Fetching with {} bound parameters", bound.values.len());

        let mut tx = self.pool.begin().await.map_err(engine_error)?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(engine_error)?;
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", self.statement_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(engine_error)?;

        let mut query: JsonRowQuery<'_> = sqlx::query_scalar(&wrapped);
        for value in bound.values {
            query = bind_value(query, value);
        }
        let fetched = query.fetch_all(&mut *tx).await;

        if let Err(e) = tx.rollback().await {
            warn!("Rollback of read-only transaction failed: {}", e);
        }

        let rows = fetched.map_err(engine_error)?.into_iter().map(into_row).collect();
        Ok(FetchedRows::from_overfetch(rows, self.max_rows))
    }
}

fn bind_value<'q>(query: JsonRowQuery<'q>, value: Value) -> JsonRowQuery<'q> {
    match value {
        Value::Bool(b) => query.bind(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s),
        Value::Null => query.bind(None::<String>),
        composite => query.bind(composite),
    }
}

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => {
            let mut row = Row::new();
            row.insert("value".to_string(), other);
            row
        }
    }
}

/// Engine faults keep the engine's own text: it is the retry feedback.
fn engine_error(error: sqlx::Error) -> QnaError {
    match error {
        sqlx::Error::Database(db) => QnaError::Execution(db.message().to_string()),
        other => QnaError::Execution(other.to_string()),
    }
}
