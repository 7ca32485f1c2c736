//! Scoped statement execution against the shared activity database.
//!
//! Every call checks out its own pooled connection and returns it when the
//! connection guard drops, whichever way the call exits. Errors are returned
//! to the caller as-is; nothing is logged and swallowed here.

use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::types::TenantId;

/// A bound statement parameter.
///
/// Values are never interpolated into SQL text; only table names produced by
/// the resolver are.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Bool(bool),
    Text(Option<String>),
}

impl SqlParam {
    /// Text form of a JSON payload value, cast server-side to the column type
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlParam::Text(None),
            Value::Bool(b) => SqlParam::Text(Some(b.to_string())),
            Value::Number(n) => SqlParam::Text(Some(n.to_string())),
            Value::String(s) => SqlParam::Text(Some(s.clone())),
            Value::Array(_) | Value::Object(_) => SqlParam::Text(Some(value.to_string())),
        }
    }
}

/// A result row as a JSON object keyed by column name
pub type JsonRow = Map<String, Value>;

#[derive(Clone, Debug)]
pub struct QueryExecutor {
    db: DatabaseManager,
    log_queries: bool,
    slow_query_threshold: Option<Duration>,
}

impl QueryExecutor {
    pub fn new(db: DatabaseManager, config: &DatabaseConfig) -> Self {
        let slow_query_threshold = config
            .enable_slow_query_warning
            .then(|| Duration::from_millis(config.slow_query_threshold_ms));
        Self {
            db,
            log_queries: config.enable_query_logging,
            slow_query_threshold,
        }
    }

    /// Run a statement whose result set has a single json column named `row`,
    /// returning one object per result row.
    pub async fn fetch_json(
        &self,
        tenant: TenantId,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<JsonRow>, DatabaseError> {
        let started = Instant::now();
        let mut conn = self.db.acquire().await?;

        let rows = bind_all(sqlx::query(sql), params).fetch_all(&mut *conn).await?;
        self.observe(tenant, sql, started);

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value: Option<Value> = row.try_get("row")?;
            if let Some(Value::Object(map)) = value {
                results.push(map);
            }
        }
        Ok(results)
    }

    /// First row of `fetch_json`, if any
    pub async fn fetch_json_optional(
        &self,
        tenant: TenantId,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<JsonRow>, DatabaseError> {
        Ok(self.fetch_json(tenant, sql, params).await?.into_iter().next())
    }

    /// Run a statement without a result set, returning affected rows
    pub async fn execute(
        &self,
        tenant: TenantId,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<u64, DatabaseError> {
        let started = Instant::now();
        let mut conn = self.db.acquire().await?;

        let result = bind_all(sqlx::query(sql), params).execute(&mut *conn).await?;
        self.observe(tenant, sql, started);
        Ok(result.rows_affected())
    }

    fn observe(&self, tenant: TenantId, sql: &str, started: Instant) {
        let elapsed = started.elapsed();
        if self.log_queries {
            debug!(tenant = %tenant, elapsed_ms = elapsed.as_millis() as u64, "sql: {}", compact(sql));
        }
        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                warn!(tenant = %tenant, elapsed_ms = elapsed.as_millis() as u64, "slow query: {}", compact(sql));
            }
        }
    }
}

fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        q = match p {
            SqlParam::Int(i) => q.bind(*i),
            SqlParam::Bool(b) => q.bind(*b),
            SqlParam::Text(s) => q.bind(s.as_deref()),
        };
    }
    q
}

fn compact(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_become_text_params() {
        assert_eq!(SqlParam::from_json(&json!("Ana")), SqlParam::Text(Some("Ana".into())));
        assert_eq!(SqlParam::from_json(&json!(12.5)), SqlParam::Text(Some("12.5".into())));
        assert_eq!(SqlParam::from_json(&json!(true)), SqlParam::Text(Some("true".into())));
        assert_eq!(SqlParam::from_json(&Value::Null), SqlParam::Text(None));
        assert_eq!(
            SqlParam::from_json(&json!({"a": 1})),
            SqlParam::Text(Some("{\"a\":1}".into()))
        );
    }

    #[test]
    fn compacts_multiline_sql_for_logs() {
        assert_eq!(compact("SELECT *\n    FROM t\n WHERE id = $1"), "SELECT * FROM t WHERE id = $1");
    }
}
