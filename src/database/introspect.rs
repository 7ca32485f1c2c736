use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::database::entity::Entity;
use crate::database::executor::{QueryExecutor, SqlParam};
use crate::database::naming::TableResolver;
use crate::database::registry::{ColumnInfo, ColumnSource};
use crate::services::error::ServiceError;
use crate::types::TenantId;

/// Form input type hint derived from a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Checkbox,
    Date,
    Email,
    Password,
    Text,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Text => "text",
        }
    }
}

const NUMERIC_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "numeric",
    "decimal",
    "real",
    "double precision",
    "serial",
    "bigserial",
    "smallserial",
    "money",
    "int2",
    "int4",
    "int8",
    "float4",
    "float8",
];

/// Type-based rules run before name-based ones, so a numeric column called
/// `email_count` is still a number.
pub fn infer_field_type(column: &ColumnInfo) -> FieldType {
    let sql_type = column.sql_type.to_ascii_lowercase();
    let base_type = sql_type.split('(').next().unwrap_or("").trim();
    let name = column.name.to_ascii_lowercase();

    if NUMERIC_TYPES.contains(&base_type) {
        FieldType::Number
    } else if base_type == "boolean" || base_type == "bool" {
        FieldType::Checkbox
    } else if base_type == "date" || base_type.starts_with("timestamp") || base_type.starts_with("time") {
        FieldType::Date
    } else if name.contains("email") {
        FieldType::Email
    } else if name.contains("password") {
        FieldType::Password
    } else {
        FieldType::Text
    }
}

/// Reads live column definitions from `information_schema`
#[derive(Clone)]
pub struct SchemaIntrospector {
    executor: QueryExecutor,
    resolver: Arc<dyn TableResolver>,
}

const COLUMNS_SQL: &str = r#"
    SELECT row_to_json(c) AS row FROM (
        SELECT column_name AS name,
               CASE WHEN data_type IN ('ARRAY', 'USER-DEFINED') THEN udt_name ELSE data_type END AS sql_type,
               (is_nullable = 'YES') AS nullable,
               column_default AS "default"
        FROM information_schema.columns
        WHERE table_schema = current_schema()
          AND table_name = $1
        ORDER BY ordinal_position
    ) c
"#;

const TABLE_EXISTS_SQL: &str = r#"
    SELECT json_build_object('exists', to_regclass(quote_ident($1)) IS NOT NULL) AS row
"#;

impl SchemaIntrospector {
    pub fn new(executor: QueryExecutor, resolver: Arc<dyn TableResolver>) -> Self {
        Self { executor, resolver }
    }

    /// Live columns in physical order. An absent table yields an empty list.
    pub async fn get_columns(&self, tenant: TenantId, entity: Entity) -> Result<Vec<ColumnInfo>, ServiceError> {
        let table = self.resolver.resolve(entity, tenant);
        let rows = self
            .executor
            .fetch_json(tenant, COLUMNS_SQL, &[SqlParam::Text(Some(table.as_str().to_string()))])
            .await?;

        let columns = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value::<ColumnInfo>(Value::Object(row)).ok())
            .collect();
        Ok(columns)
    }

    /// Column name to form field type, in column order
    pub async fn get_field_types(
        &self,
        tenant: TenantId,
        entity: Entity,
    ) -> Result<Vec<(String, FieldType)>, ServiceError> {
        Ok(self
            .get_columns(tenant, entity)
            .await?
            .iter()
            .map(|c| (c.name.clone(), infer_field_type(c)))
            .collect())
    }

    pub async fn table_exists(&self, tenant: TenantId, entity: Entity) -> Result<bool, ServiceError> {
        let table = self.resolver.resolve(entity, tenant);
        let row = self
            .executor
            .fetch_json_optional(tenant, TABLE_EXISTS_SQL, &[SqlParam::Text(Some(table.as_str().to_string()))])
            .await?;
        Ok(row
            .and_then(|r| r.get("exists").and_then(Value::as_bool))
            .unwrap_or(false))
    }
}

#[async_trait]
impl ColumnSource for SchemaIntrospector {
    async fn columns(&self, tenant: TenantId, entity: Entity) -> Result<Vec<ColumnInfo>, ServiceError> {
        self.get_columns(tenant, entity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, sql_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            default: None,
        }
    }

    #[test]
    fn numeric_types_are_numbers() {
        assert_eq!(infer_field_type(&column("price", "numeric")), FieldType::Number);
        assert_eq!(infer_field_type(&column("quantity", "integer")), FieldType::Number);
        assert_eq!(infer_field_type(&column("ratio", "double precision")), FieldType::Number);
        assert_eq!(infer_field_type(&column("price", "NUMERIC(12,2)")), FieldType::Number);
    }

    #[test]
    fn booleans_and_temporal_types() {
        assert_eq!(infer_field_type(&column("is_active", "boolean")), FieldType::Checkbox);
        assert_eq!(infer_field_type(&column("due_date", "date")), FieldType::Date);
        assert_eq!(
            infer_field_type(&column("created_at", "timestamp without time zone")),
            FieldType::Date
        );
    }

    #[test]
    fn type_rules_take_precedence_over_name_rules() {
        assert_eq!(infer_field_type(&column("email_count", "integer")), FieldType::Number);
        assert_eq!(infer_field_type(&column("password_changed", "boolean")), FieldType::Checkbox);
        assert_eq!(infer_field_type(&column("email_verified_at", "timestamp with time zone")), FieldType::Date);
    }

    #[test]
    fn name_rules_for_text_columns() {
        assert_eq!(infer_field_type(&column("email", "character varying")), FieldType::Email);
        assert_eq!(infer_field_type(&column("contact_email", "text")), FieldType::Email);
        assert_eq!(infer_field_type(&column("password", "character varying")), FieldType::Password);
        assert_eq!(infer_field_type(&column("address", "text")), FieldType::Text);
    }

    #[test]
    fn field_types_serialize_lowercase() {
        assert_eq!(serde_json::to_value(FieldType::Checkbox).unwrap(), "checkbox");
    }
}
