use std::sync::Arc;
use tracing::{debug, info};

use crate::database::entity::Entity;
use crate::database::executor::QueryExecutor;
use crate::database::manager::DatabaseError;
use crate::database::naming::{TableName, TableResolver};
use crate::database::registry::{create_table_ddl, drop_table_ddl};
use crate::services::error::ServiceError;
use crate::types::TenantId;

/// Creates and drops the full set of per-tenant tables.
///
/// Each statement is independently idempotent, so a run that fails halfway
/// leaves the earlier tables in place and is repaired by running it again.
/// Authorization (e.g. never dropping an administrator's tables) is the
/// caller's job.
#[derive(Clone)]
pub struct TenantProvisioner {
    executor: QueryExecutor,
    resolver: Arc<dyn TableResolver>,
}

impl TenantProvisioner {
    pub fn new(executor: QueryExecutor, resolver: Arc<dyn TableResolver>) -> Self {
        Self { executor, resolver }
    }

    /// `CREATE TABLE IF NOT EXISTS` for every entity. Safe to call on every login.
    pub async fn provision(&self, tenant: TenantId) -> Result<Vec<TableName>, ServiceError> {
        let mut tables = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            let table = self.resolver.resolve(entity, tenant);
            match self.executor.execute(tenant, &create_table_ddl(&table, entity), &[]).await {
                Ok(_) => {}
                Err(err) if lost_create_race(&err) => {
                    debug!(tenant = %tenant, table = %table, "table created concurrently");
                }
                Err(err) => return Err(err.into()),
            }
            tables.push(table);
        }
        info!(tenant = %tenant, tables = tables.len(), "Provisioned tenant tables");
        Ok(tables)
    }

    /// `DROP TABLE IF EXISTS ... CASCADE` for every entity
    pub async fn deprovision(&self, tenant: TenantId) -> Result<Vec<TableName>, ServiceError> {
        let mut tables = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            let table = self.resolver.resolve(entity, tenant);
            self.executor.execute(tenant, &drop_table_ddl(&table), &[]).await?;
            tables.push(table);
        }
        info!(tenant = %tenant, tables = tables.len(), "Dropped tenant tables");
        Ok(tables)
    }
}

/// Two concurrent `CREATE TABLE IF NOT EXISTS` on the same name can both pass
/// the existence check; the loser fails on the catalog's unique index.
pub(crate) fn lost_create_race(err: &DatabaseError) -> bool {
    match err {
        DatabaseError::Sqlx(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("42P07") | Some("23505"))
        }
        _ => false,
    }
}
