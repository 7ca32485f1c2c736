//! Generic create/read/update/delete over any tenant entity table.
//!
//! Writes are shaped by the live column list, not by the static registry:
//! unknown keys are dropped silently, and a write left with nothing to store is
//! rejected.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::config::ApiConfig;
use crate::database::entity::Entity;
use crate::database::executor::{JsonRow, QueryExecutor, SqlParam};
use crate::database::introspect::SchemaIntrospector;
use crate::database::manager::DatabaseError;
use crate::database::naming::{quote_ident, TableName, TableResolver};
use crate::database::registry::ColumnInfo;
use crate::services::error::ServiceError;
use crate::types::TenantId;

const UNDEFINED_TABLE: &str = "42P01";
const UPDATED_AT: &str = "updated_at";

/// Which system columns a write may not set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

impl WriteMode {
    fn excluded(self) -> &'static [&'static str] {
        match self {
            WriteMode::Create => &["id", "created_at", "updated_at"],
            WriteMode::Update => &["id", "created_at"],
        }
    }
}

/// Keep only payload keys that are live, writable columns.
///
/// Create additionally drops null and empty-string values so that column
/// defaults apply; update keeps explicit nulls so a field can be cleared.
pub fn filter_payload<'c>(
    columns: &'c [ColumnInfo],
    payload: &Map<String, Value>,
    mode: WriteMode,
) -> Vec<(&'c ColumnInfo, Value)> {
    columns
        .iter()
        .filter(|c| !mode.excluded().contains(&c.name.as_str()))
        .filter_map(|c| payload.get(&c.name).map(|v| (c, v)))
        .filter(|(_, v)| match mode {
            WriteMode::Create => !v.is_null() && v.as_str() != Some(""),
            WriteMode::Update => true,
        })
        .map(|(c, v)| (c, v.clone()))
        .collect()
}

/// SQL type to cast a text parameter to. The type comes from the catalog but is
/// still interpolated, so it is held to a conservative character set.
fn cast_target(column: &ColumnInfo) -> Result<&str, ServiceError> {
    let ty = column.sql_type.as_str();
    let safe = !ty.is_empty()
        && ty
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ','));
    if safe {
        Ok(ty)
    } else {
        Err(ServiceError::validation(format!(
            "column {} has unsupported type {}",
            column.name, column.sql_type
        )))
    }
}

fn is_undefined_table(err: &DatabaseError) -> bool {
    match err {
        DatabaseError::Sqlx(sqlx::Error::Database(db_err)) => {
            db_err.code().map_or(false, |code| code == UNDEFINED_TABLE)
        }
        _ => false,
    }
}

/// Build `INSERT ... RETURNING` wrapped to yield one json `row`
pub fn build_insert(table: &TableName, fields: &[(&ColumnInfo, Value)]) -> Result<(String, Vec<SqlParam>), ServiceError> {
    let mut names = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len());

    for (i, (column, value)) in fields.iter().enumerate() {
        names.push(quote_ident(&column.name));
        placeholders.push(format!("CAST(${} AS {})", i + 1, cast_target(column)?));
        params.push(SqlParam::from_json(value));
    }

    let sql = format!(
        "WITH t AS (INSERT INTO {} ({}) VALUES ({}) RETURNING *) SELECT row_to_json(t) AS row FROM t",
        table.quoted(),
        names.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, params))
}

/// Whether an update should stamp `updated_at`: the live table has the column
/// and the payload does not set it explicitly
pub fn touches_updated_at(columns: &[ColumnInfo], fields: &[(&ColumnInfo, Value)]) -> bool {
    columns.iter().any(|c| c.name == UPDATED_AT) && !fields.iter().any(|(c, _)| c.name == UPDATED_AT)
}

/// Build `UPDATE ... WHERE id = $n RETURNING` wrapped to yield one json `row`
pub fn build_update(
    table: &TableName,
    id: i64,
    fields: &[(&ColumnInfo, Value)],
    touch_updated_at: bool,
) -> Result<(String, Vec<SqlParam>), ServiceError> {
    let mut assignments = Vec::with_capacity(fields.len() + 1);
    let mut params = Vec::with_capacity(fields.len() + 1);

    for (i, (column, value)) in fields.iter().enumerate() {
        assignments.push(format!("{} = CAST(${} AS {})", quote_ident(&column.name), i + 1, cast_target(column)?));
        params.push(SqlParam::from_json(value));
    }
    if touch_updated_at {
        assignments.push(format!("{} = NOW()", quote_ident(UPDATED_AT)));
    }
    params.push(SqlParam::Int(id));

    let sql = format!(
        "WITH t AS (UPDATE {} SET {} WHERE \"id\" = ${} RETURNING *) SELECT row_to_json(t) AS row FROM t",
        table.quoted(),
        assignments.join(", "),
        params.len()
    );
    Ok((sql, params))
}

#[derive(Clone)]
pub struct CrudEngine {
    executor: QueryExecutor,
    introspector: SchemaIntrospector,
    resolver: Arc<dyn TableResolver>,
    default_limit: i64,
    max_limit: i64,
}

impl CrudEngine {
    pub fn new(
        executor: QueryExecutor,
        introspector: SchemaIntrospector,
        resolver: Arc<dyn TableResolver>,
        api: &ApiConfig,
    ) -> Self {
        Self {
            executor,
            introspector,
            resolver,
            default_limit: api.default_page_size,
            max_limit: api.max_page_size,
        }
    }

    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.introspector
    }

    pub fn table(&self, entity: Entity, tenant: TenantId) -> TableName {
        self.resolver.resolve(entity, tenant)
    }

    /// Newest first. A table that was never provisioned lists as empty.
    pub async fn list(
        &self,
        tenant: TenantId,
        entity: Entity,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<JsonRow>, ServiceError> {
        let limit = limit.unwrap_or(self.default_limit);
        let offset = offset.unwrap_or(0);
        if limit < 0 {
            return Err(ServiceError::validation("limit must be non-negative"));
        }
        if offset < 0 {
            return Err(ServiceError::validation("offset must be non-negative"));
        }
        let limit = limit.min(self.max_limit);

        let table = self.table(entity, tenant);
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM {} t ORDER BY t.\"id\" DESC LIMIT $1 OFFSET $2",
            table.quoted()
        );
        self.fetch_or_empty(tenant, &sql, &[SqlParam::Int(limit), SqlParam::Int(offset)])
            .await
            .map(|rows| rows.unwrap_or_default())
    }

    /// Every row of the table, or `None` when the table does not exist
    pub async fn list_all(&self, tenant: TenantId, entity: Entity) -> Result<Option<Vec<JsonRow>>, ServiceError> {
        let table = self.table(entity, tenant);
        let sql = format!("SELECT row_to_json(t) AS row FROM {} t ORDER BY t.\"id\"", table.quoted());
        self.fetch_or_empty(tenant, &sql, &[]).await
    }

    /// Up to `limit` rows with `id` above `after_id`, oldest first, or `None`
    /// when the table does not exist. Walks a whole table in bounded pages.
    pub async fn page_after(
        &self,
        tenant: TenantId,
        entity: Entity,
        after_id: i64,
        limit: i64,
    ) -> Result<Option<Vec<JsonRow>>, ServiceError> {
        let table = self.table(entity, tenant);
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM {} t WHERE t.\"id\" > $1 ORDER BY t.\"id\" LIMIT $2",
            table.quoted()
        );
        self.fetch_or_empty(tenant, &sql, &[SqlParam::Int(after_id), SqlParam::Int(limit)])
            .await
    }

    /// Rows whose boolean `column` equals `value`, newest first
    pub async fn list_where(
        &self,
        tenant: TenantId,
        entity: Entity,
        column: &str,
        value: bool,
    ) -> Result<Vec<JsonRow>, ServiceError> {
        let columns = self.introspector.get_columns(tenant, entity).await?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let live = columns
            .iter()
            .find(|c| c.name == column)
            .ok_or_else(|| ServiceError::validation(format!("unknown column: {}", column)))?;

        let table = self.table(entity, tenant);
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM {} t WHERE t.{} = $1 ORDER BY t.\"id\" DESC",
            table.quoted(),
            quote_ident(&live.name)
        );
        self.fetch_or_empty(tenant, &sql, &[SqlParam::Bool(value)])
            .await
            .map(|rows| rows.unwrap_or_default())
    }

    /// `Ok(None)` when the record (or its table) does not exist
    pub async fn get(&self, tenant: TenantId, entity: Entity, id: i64) -> Result<Option<JsonRow>, ServiceError> {
        let table = self.table(entity, tenant);
        let sql = format!("SELECT row_to_json(t) AS row FROM {} t WHERE t.\"id\" = $1", table.quoted());
        Ok(self
            .fetch_or_empty(tenant, &sql, &[SqlParam::Int(id)])
            .await?
            .and_then(|rows| rows.into_iter().next()))
    }

    pub async fn get_404(&self, tenant: TenantId, entity: Entity, id: i64) -> Result<JsonRow, ServiceError> {
        self.get(tenant, entity, id)
            .await?
            .ok_or_else(|| not_found(entity))
    }

    /// Insert the live-column subset of `payload`. The table must already be provisioned.
    pub async fn create(
        &self,
        tenant: TenantId,
        entity: Entity,
        payload: &Map<String, Value>,
    ) -> Result<JsonRow, ServiceError> {
        let columns = self.introspector.get_columns(tenant, entity).await?;
        if columns.is_empty() {
            return Err(ServiceError::not_found(format!(
                "{} table is not provisioned for tenant {}",
                entity.label(),
                tenant
            )));
        }

        let fields = filter_payload(&columns, payload, WriteMode::Create);
        if fields.is_empty() {
            return Err(ServiceError::validation("no valid fields to create"));
        }
        debug!(tenant = %tenant, entity = %entity, fields = fields.len(), "creating record");

        let table = self.table(entity, tenant);
        let (sql, params) = build_insert(&table, &fields)?;
        self.executor
            .fetch_json_optional(tenant, &sql, &params)
            .await?
            .ok_or_else(|| ServiceError::Database(DatabaseError::Sqlx(sqlx::Error::RowNotFound)))
    }

    /// Partial update of an existing record
    pub async fn update(
        &self,
        tenant: TenantId,
        entity: Entity,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<JsonRow, ServiceError> {
        let columns = self.introspector.get_columns(tenant, entity).await?;
        if columns.is_empty() || self.get(tenant, entity, id).await?.is_none() {
            return Err(not_found(entity));
        }

        let fields = filter_payload(&columns, payload, WriteMode::Update);
        if fields.is_empty() {
            return Err(ServiceError::validation("no valid fields to update"));
        }
        debug!(tenant = %tenant, entity = %entity, id, fields = fields.len(), "updating record");

        let table = self.table(entity, tenant);
        let touch = touches_updated_at(&columns, &fields);
        let (sql, params) = build_update(&table, id, &fields, touch)?;
        // A concurrent delete between the check and the update surfaces as not found
        self.executor
            .fetch_json_optional(tenant, &sql, &params)
            .await?
            .ok_or_else(|| not_found(entity))
    }

    /// Hard delete, returning the removed row
    pub async fn delete(&self, tenant: TenantId, entity: Entity, id: i64) -> Result<JsonRow, ServiceError> {
        if self.get(tenant, entity, id).await?.is_none() {
            return Err(not_found(entity));
        }

        let table = self.table(entity, tenant);
        let sql = format!(
            "WITH t AS (DELETE FROM {} WHERE \"id\" = $1 RETURNING *) SELECT row_to_json(t) AS row FROM t",
            table.quoted()
        );
        debug!(tenant = %tenant, entity = %entity, id, "deleting record");
        self.executor
            .fetch_json_optional(tenant, &sql, &[SqlParam::Int(id)])
            .await?
            .ok_or_else(|| not_found(entity))
    }

    async fn fetch_or_empty(
        &self,
        tenant: TenantId,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<Vec<JsonRow>>, ServiceError> {
        match self.executor.fetch_json(tenant, sql, params).await {
            Ok(rows) => Ok(Some(rows)),
            Err(err) if is_undefined_table(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn not_found(entity: Entity) -> ServiceError {
    ServiceError::not_found(format!("{} not found", entity.label()))
}
