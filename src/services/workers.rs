use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::database::entity::Entity;
use crate::database::executor::JsonRow;
use crate::services::credentials::CredentialService;
use crate::services::crud::CrudEngine;
use crate::services::error::ServiceError;
use crate::services::namespace::NamespaceService;
use crate::types::TenantId;

const ENTITY: Entity = Entity::SubordinateWorker;
const ACTIVE_COLUMN: &str = "is_active";
const PASSWORD_COLUMN: &str = "password";

/// Subordinate-worker accounts of a tenant, on top of the CRUD engine.
/// Stored passwords are argon2 hashes and are never handed back.
#[derive(Clone)]
pub struct WorkerService {
    crud: CrudEngine,
    credentials: Arc<dyn CredentialService>,
    namespace: NamespaceService,
}

impl WorkerService {
    pub fn new(crud: CrudEngine, credentials: Arc<dyn CredentialService>, namespace: NamespaceService) -> Self {
        Self {
            crud,
            credentials,
            namespace,
        }
    }

    pub async fn list(&self, tenant: TenantId, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<JsonRow>, ServiceError> {
        Ok(strip_all(self.crud.list(tenant, ENTITY, limit, offset).await?))
    }

    pub async fn list_active(&self, tenant: TenantId) -> Result<Vec<JsonRow>, ServiceError> {
        Ok(strip_all(self.crud.list_where(tenant, ENTITY, ACTIVE_COLUMN, true).await?))
    }

    pub async fn list_archived(&self, tenant: TenantId) -> Result<Vec<JsonRow>, ServiceError> {
        Ok(strip_all(self.crud.list_where(tenant, ENTITY, ACTIVE_COLUMN, false).await?))
    }

    pub async fn get(&self, tenant: TenantId, id: i64) -> Result<JsonRow, ServiceError> {
        self.crud.get_404(tenant, ENTITY, id).await.map(strip)
    }

    pub async fn create(&self, tenant: TenantId, payload: &Map<String, Value>) -> Result<JsonRow, ServiceError> {
        for field in ["name", "email", PASSWORD_COLUMN] {
            if non_empty_str(payload, field).is_none() {
                return Err(ServiceError::validation(format!("{} is required", field)));
            }
        }

        let mut payload = payload.clone();
        self.hash_password_field(&mut payload)?;
        let row = self
            .crud
            .create(tenant, ENTITY, &payload)
            .await
            .map_err(duplicate_email)?;

        info!(tenant = %tenant, id = ?row.get("id"), "Created subordinate worker");
        self.namespace.refresh_snapshot_best_effort(tenant).await;
        Ok(strip(row))
    }

    /// Partial update. A non-empty `password` is re-hashed; an empty one is ignored.
    pub async fn update(&self, tenant: TenantId, id: i64, payload: &Map<String, Value>) -> Result<JsonRow, ServiceError> {
        let mut payload = payload.clone();
        if non_empty_str(&payload, PASSWORD_COLUMN).is_some() {
            self.hash_password_field(&mut payload)?;
        } else {
            payload.remove(PASSWORD_COLUMN);
        }

        let row = self
            .crud
            .update(tenant, ENTITY, id, &payload)
            .await
            .map_err(duplicate_email)?;
        self.namespace.refresh_snapshot_best_effort(tenant).await;
        Ok(strip(row))
    }

    /// Soft delete: the row stays and moves to the archived view
    pub async fn deactivate(&self, tenant: TenantId, id: i64) -> Result<JsonRow, ServiceError> {
        let mut payload = Map::new();
        payload.insert(ACTIVE_COLUMN.to_string(), Value::Bool(false));
        let row = self.crud.update(tenant, ENTITY, id, &payload).await?;

        info!(tenant = %tenant, id, "Deactivated subordinate worker");
        self.namespace.refresh_snapshot_best_effort(tenant).await;
        Ok(strip(row))
    }

    fn hash_password_field(&self, payload: &mut Map<String, Value>) -> Result<(), ServiceError> {
        if let Some(plain) = non_empty_str(payload, PASSWORD_COLUMN) {
            let hash = self.credentials.hash_password(plain)?;
            payload.insert(PASSWORD_COLUMN.to_string(), Value::String(hash));
        }
        Ok(())
    }
}

fn non_empty_str<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn duplicate_email(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::Conflict(_) => ServiceError::conflict("a worker with this email already exists"),
        other => other,
    }
}

fn strip(mut row: JsonRow) -> JsonRow {
    row.remove(PASSWORD_COLUMN);
    row
}

fn strip_all(rows: Vec<JsonRow>) -> Vec<JsonRow> {
    rows.into_iter().map(strip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_field_detection_ignores_blank_strings() {
        let payload = json!({"name": "  ", "email": "w@shop.com", "password": 42});
        let payload = payload.as_object().unwrap();
        assert!(non_empty_str(payload, "name").is_none());
        assert_eq!(non_empty_str(payload, "email"), Some("w@shop.com"));
        assert!(non_empty_str(payload, "password").is_none());
    }

    #[test]
    fn conflicts_are_reworded_and_other_errors_pass_through() {
        let err = duplicate_email(ServiceError::conflict("record violates unique constraint x"));
        assert_eq!(err.to_string(), "a worker with this email already exists");
        assert!(duplicate_email(ServiceError::not_found("Subordinate worker not found")).is_not_found());
    }

    #[test]
    fn strip_removes_password_hash() {
        let row = json!({"id": 1, "password": "$argon2id$..."}).as_object().cloned().unwrap();
        assert!(!strip(row).contains_key("password"));
    }
}
