use serde_json::Value;
use tracing::{debug, info, warn};

use crate::database::entity::Entity;
use crate::services::crud::CrudEngine;
use crate::services::error::ServiceError;
use crate::storage::{export_stream, ArchiveSnapshot, ByteStream, DumpSpool, EntityDump, TenantFs};
use crate::types::TenantId;

/// Rows fetched per round trip while spooling a table for export
const EXPORT_PAGE_SIZE: i64 = 500;

/// Operations that span a tenant's tables and its filesystem namespace
#[derive(Clone)]
pub struct NamespaceService {
    crud: CrudEngine,
    fs: TenantFs,
}

impl NamespaceService {
    pub fn new(crud: CrudEngine, fs: TenantFs) -> Self {
        Self { crud, fs }
    }

    pub fn fs(&self) -> &TenantFs {
        &self.fs
    }

    /// Full backup as a `tar.gz` stream. Tables are spooled page by page
    /// first; an entity whose table is missing is skipped with a warning.
    pub async fn export(&self, tenant: TenantId) -> Result<ByteStream, ServiceError> {
        self.fs.ensure_namespace_best_effort(tenant).await;

        let mut dumps = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            match self.spool_table(tenant, entity).await? {
                Some(dump) => dumps.push(dump),
                None => {
                    warn!(tenant = %tenant, table = %self.crud.table(entity, tenant), "Export skipped missing table")
                }
            }
        }

        info!(tenant = %tenant, tables = dumps.len(), "Starting export");
        Ok(export_stream(self.fs.tenant_root(tenant), dumps))
    }

    /// Keyset walk over one table in id order. `None` when the table is missing.
    async fn spool_table(&self, tenant: TenantId, entity: Entity) -> Result<Option<EntityDump>, ServiceError> {
        let Some(mut page) = self.crud.page_after(tenant, entity, 0, EXPORT_PAGE_SIZE).await? else {
            return Ok(None);
        };
        let table = self.crud.table(entity, tenant);
        let mut spool = DumpSpool::create(table.as_str()).await?;

        loop {
            for row in &page {
                spool.push(row).await?;
            }
            let last_id = page.last().and_then(|row| row.get("id")).and_then(Value::as_i64);
            match last_id {
                Some(after) if page.len() as i64 == EXPORT_PAGE_SIZE => {
                    page = self
                        .crud
                        .page_after(tenant, entity, after, EXPORT_PAGE_SIZE)
                        .await?
                        .unwrap_or_default();
                }
                _ => break,
            }
        }

        let dump = spool.finish().await?;
        debug!(tenant = %tenant, table = %table, rows = dump.rows, "Spooled table for export");
        Ok(Some(dump))
    }

    /// Rewrite `archive/data.json` from the current worker rows
    pub async fn update_archive_snapshot(&self, tenant: TenantId) -> Result<ArchiveSnapshot, ServiceError> {
        let rows = self
            .crud
            .list_all(tenant, Entity::SubordinateWorker)
            .await?
            .unwrap_or_default();
        let snapshot = ArchiveSnapshot::from_workers(tenant, rows);
        self.fs.write_snapshot(tenant, &snapshot).await?;
        Ok(snapshot)
    }

    /// Snapshot refresh after a worker change; failure never fails the change
    pub async fn refresh_snapshot_best_effort(&self, tenant: TenantId) {
        if let Err(e) = self.update_archive_snapshot(tenant).await {
            warn!(tenant = %tenant, "Archive snapshot refresh failed: {}", e);
        }
    }
}
