use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::executor::JsonRow;
use crate::types::TenantId;

/// `archive/data.json`: subordinate-worker state derived from the relational side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSnapshot {
    pub user_id: i64,
    pub last_updated: DateTime<Utc>,
    pub subordinate_workers: WorkerSummary,
    pub permissions: Map<String, Value>,
    pub activity_history: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub total: usize,
    pub active_count: usize,
    pub archived_count: usize,
    pub active: Vec<JsonRow>,
    pub archived: Vec<JsonRow>,
}

impl ArchiveSnapshot {
    pub fn empty(tenant: TenantId) -> Self {
        Self {
            user_id: tenant.get(),
            last_updated: Utc::now(),
            subordinate_workers: WorkerSummary::default(),
            permissions: Map::new(),
            activity_history: Vec::new(),
        }
    }

    /// Partition worker rows on `is_active`; anything not explicitly false is active.
    /// Password hashes never reach the snapshot.
    pub fn from_workers(tenant: TenantId, rows: Vec<JsonRow>) -> Self {
        let (active, archived): (Vec<JsonRow>, Vec<JsonRow>) = rows
            .into_iter()
            .map(|mut row| {
                row.remove("password");
                row
            })
            .partition(|row| row.get("is_active").and_then(Value::as_bool) != Some(false));

        let mut snapshot = Self::empty(tenant);
        snapshot.subordinate_workers = WorkerSummary {
            total: active.len() + archived.len(),
            active_count: active.len(),
            archived_count: archived.len(),
            active,
            archived,
        };
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> JsonRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn partitions_on_active_flag_and_strips_passwords() {
        let rows = vec![
            row(json!({"id": 1, "email": "a@x.com", "is_active": true, "password": "hash"})),
            row(json!({"id": 2, "email": "b@x.com", "is_active": false, "password": "hash"})),
            row(json!({"id": 3, "email": "c@x.com", "is_active": true})),
        ];
        let snapshot = ArchiveSnapshot::from_workers(TenantId::new(9).unwrap(), rows);
        let summary = &snapshot.subordinate_workers;
        assert_eq!((summary.total, summary.active_count, summary.archived_count), (3, 2, 1));
        assert_eq!(summary.archived[0]["id"], 2);
        assert!(summary.active.iter().chain(&summary.archived).all(|r| !r.contains_key("password")));
    }

    #[test]
    fn serialized_shape_has_placeholder_sections() {
        let doc = serde_json::to_value(ArchiveSnapshot::empty(TenantId::new(4).unwrap())).unwrap();
        assert_eq!(doc["userId"], 4);
        assert_eq!(doc["subordinateWorkers"]["total"], 0);
        assert_eq!(doc["subordinateWorkers"]["activeCount"], 0);
        assert!(doc["permissions"].as_object().unwrap().is_empty());
        assert!(doc["activityHistory"].as_array().unwrap().is_empty());
    }
}
