//! Canonical column definitions for every entity, used to provision tables.
//!
//! Only provisioning reads these. Payload validation always goes through the
//! live catalog (see `introspect`), because provisioned tables may have drifted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::database::entity::Entity;
use crate::database::naming::TableName;
use crate::services::error::ServiceError;
use crate::types::TenantId;

/// One canonical column: name, SQL type and trailing constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub constraints: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str, constraints: &'static str) -> ColumnDef {
    ColumnDef { name, sql_type, constraints }
}

/// Column description shared by the static registry and the live catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

const ID: ColumnDef = col("id", "SERIAL", "PRIMARY KEY");
const CREATED_AT: ColumnDef = col("created_at", "TIMESTAMP", "NOT NULL DEFAULT NOW()");
const UPDATED_AT: ColumnDef = col("updated_at", "TIMESTAMP", "NOT NULL DEFAULT NOW()");

const CUSTOMERS: &[ColumnDef] = &[
    ID,
    col("name", "VARCHAR(255)", "NOT NULL"),
    col("surname", "VARCHAR(255)", ""),
    col("email", "VARCHAR(255)", ""),
    col("phone", "VARCHAR(50)", ""),
    col("address", "TEXT", ""),
    CREATED_AT,
    UPDATED_AT,
];

const PRODUCTS: &[ColumnDef] = &[
    ID,
    col("name", "VARCHAR(255)", "NOT NULL"),
    col("description", "TEXT", ""),
    col("price", "NUMERIC(12,2)", "NOT NULL DEFAULT 0"),
    col("sku", "VARCHAR(100)", ""),
    col("image_path", "TEXT", ""),
    CREATED_AT,
    UPDATED_AT,
];

const ORDERS: &[ColumnDef] = &[
    ID,
    col("customer_id", "INTEGER", ""),
    col("status", "VARCHAR(50)", "NOT NULL DEFAULT 'pending'"),
    col("total_amount", "NUMERIC(12,2)", "NOT NULL DEFAULT 0"),
    col("order_date", "TIMESTAMP", "DEFAULT NOW()"),
    col("notes", "TEXT", ""),
    CREATED_AT,
    UPDATED_AT,
];

const STOCKS: &[ColumnDef] = &[
    ID,
    col("product_id", "INTEGER", ""),
    col("quantity", "INTEGER", "NOT NULL DEFAULT 0"),
    col("location", "VARCHAR(255)", ""),
    col("last_restock_date", "DATE", ""),
    CREATED_AT,
    UPDATED_AT,
];

const INVOICES: &[ColumnDef] = &[
    ID,
    col("order_id", "INTEGER", ""),
    col("invoice_number", "VARCHAR(100)", ""),
    col("issue_date", "DATE", "DEFAULT CURRENT_DATE"),
    col("due_date", "DATE", ""),
    col("amount", "NUMERIC(12,2)", "NOT NULL DEFAULT 0"),
    col("status", "VARCHAR(50)", "NOT NULL DEFAULT 'unpaid'"),
    col("file_path", "TEXT", ""),
    CREATED_AT,
    UPDATED_AT,
];

const PAYMENT_LOGS: &[ColumnDef] = &[
    ID,
    col("invoice_id", "INTEGER", ""),
    col("amount", "NUMERIC(12,2)", "NOT NULL"),
    col("method", "VARCHAR(50)", ""),
    col("reference", "VARCHAR(255)", ""),
    col("paid_at", "TIMESTAMP", "DEFAULT NOW()"),
    col("notes", "TEXT", ""),
    CREATED_AT,
];

// email uniqueness is enforced here rather than by a check-then-insert
const SUBORDINATE_WORKERS: &[ColumnDef] = &[
    ID,
    col("name", "VARCHAR(255)", "NOT NULL"),
    col("surname", "VARCHAR(255)", ""),
    col("email", "VARCHAR(255)", "NOT NULL UNIQUE"),
    col("role", "VARCHAR(100)", ""),
    col("password", "VARCHAR(255)", "NOT NULL"),
    col("is_active", "BOOLEAN", "NOT NULL DEFAULT TRUE"),
    CREATED_AT,
    UPDATED_AT,
];

/// Canonical columns for an entity, in physical order
pub fn columns(entity: Entity) -> &'static [ColumnDef] {
    match entity {
        Entity::Customer => CUSTOMERS,
        Entity::Product => PRODUCTS,
        Entity::Order => ORDERS,
        Entity::Stock => STOCKS,
        Entity::Invoice => INVOICES,
        Entity::PaymentLog => PAYMENT_LOGS,
        Entity::SubordinateWorker => SUBORDINATE_WORKERS,
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for one entity's physical table
pub fn create_table_ddl(table: &TableName, entity: Entity) -> String {
    let body = columns(entity)
        .iter()
        .map(|c| {
            if c.constraints.is_empty() {
                format!("    \"{}\" {}", c.name, c.sql_type)
            } else {
                format!("    \"{}\" {} {}", c.name, c.sql_type, c.constraints)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", table.quoted(), body)
}

/// `DROP TABLE IF EXISTS ... CASCADE` for one physical table
pub fn drop_table_ddl(table: &TableName) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", table.quoted())
}

/// Anything that can describe the columns of a tenant's entity table
#[async_trait]
pub trait ColumnSource: Send + Sync {
    async fn columns(&self, tenant: TenantId, entity: Entity) -> Result<Vec<ColumnInfo>, ServiceError>;
}

/// The canonical definitions, exposed as a column source
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticColumns;

impl StaticColumns {
    pub fn describe(entity: Entity) -> Vec<ColumnInfo> {
        columns(entity)
            .iter()
            .map(|c| {
                let upper = c.constraints.to_ascii_uppercase();
                let default = upper.find("DEFAULT ").map(|idx| c.constraints[idx + 8..].trim().to_string());
                ColumnInfo {
                    name: c.name.to_string(),
                    sql_type: c.sql_type.to_ascii_lowercase(),
                    nullable: !(upper.contains("NOT NULL") || upper.contains("PRIMARY KEY")),
                    default,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ColumnSource for StaticColumns {
    async fn columns(&self, _tenant: TenantId, entity: Entity) -> Result<Vec<ColumnInfo>, ServiceError> {
        Ok(Self::describe(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::naming::{SuffixResolver, TableResolver};

    #[test]
    fn every_entity_has_id_and_created_at() {
        for entity in Entity::ALL {
            let cols = columns(entity);
            assert_eq!(cols[0].name, "id", "{:?}", entity);
            assert!(cols.iter().any(|c| c.name == "created_at"), "{:?}", entity);
        }
    }

    #[test]
    fn workers_carry_soft_delete_flag_and_unique_email() {
        let cols = columns(Entity::SubordinateWorker);
        let active = cols.iter().find(|c| c.name == "is_active").unwrap();
        assert_eq!(active.sql_type, "BOOLEAN");
        let email = cols.iter().find(|c| c.name == "email").unwrap();
        assert!(email.constraints.contains("UNIQUE"));
    }

    #[test]
    fn ddl_is_idempotent_and_quoted() {
        let table = SuffixResolver.resolve(Entity::Customer, TenantId::new(42).unwrap());
        let ddl = create_table_ddl(&table, Entity::Customer);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"customers_42\" ("));
        assert!(ddl.contains("\"id\" SERIAL PRIMARY KEY"));
        assert!(ddl.contains("\"surname\" VARCHAR(255)\n") || ddl.contains("\"surname\" VARCHAR(255),"));
        assert_eq!(drop_table_ddl(&table), "DROP TABLE IF EXISTS \"customers_42\" CASCADE");
    }

    #[test]
    fn static_description_reports_nullability_and_defaults() {
        let cols = StaticColumns::describe(Entity::Order);
        let status = cols.iter().find(|c| c.name == "status").unwrap();
        assert!(!status.nullable);
        assert_eq!(status.default.as_deref(), Some("'pending'"));
        let notes = cols.iter().find(|c| c.name == "notes").unwrap();
        assert!(notes.nullable);
        assert_eq!(notes.default, None);
        let id = cols.iter().find(|c| c.name == "id").unwrap();
        assert!(!id.nullable);
    }
}
