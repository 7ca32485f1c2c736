use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TenantId;

/// Root `data.json` of a tenant namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub store_info: StoreInfo,
    #[serde(default)]
    pub settings: StoreSettings,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreSettings {
    pub currency: String,
    pub language: String,
    pub tax_rate: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            language: "en".to_string(),
            tax_rate: 0.0,
        }
    }
}

/// Partial update accepted from clients; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub store_info: Option<StoreInfoPatch>,
    pub settings: Option<StoreSettingsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreInfoPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreSettingsPatch {
    pub currency: Option<String>,
    pub language: Option<String>,
    pub tax_rate: Option<f64>,
}

impl TenantSettings {
    pub fn initial(tenant: TenantId) -> Self {
        let now = Utc::now();
        Self {
            user_id: tenant.get(),
            created_at: now,
            store_info: StoreInfo::default(),
            settings: StoreSettings::default(),
            last_updated: now,
        }
    }

    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(info) = patch.store_info {
            if let Some(v) = info.name {
                self.store_info.name = v;
            }
            if let Some(v) = info.address {
                self.store_info.address = v;
            }
            if let Some(v) = info.phone {
                self.store_info.phone = v;
            }
            if let Some(v) = info.email {
                self.store_info.email = v;
            }
        }
        if let Some(settings) = patch.settings {
            if let Some(v) = settings.currency {
                self.settings.currency = v;
            }
            if let Some(v) = settings.language {
                self.settings.language = v;
            }
            if let Some(v) = settings.tax_rate {
                self.settings.tax_rate = v;
            }
        }
        self.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_document_has_stable_shape() {
        let doc = serde_json::to_value(TenantSettings::initial(TenantId::new(42).unwrap())).unwrap();
        assert_eq!(doc["userId"], 42);
        assert!(doc["createdAt"].is_string());
        assert!(doc["lastUpdated"].is_string());
        assert_eq!(doc["storeInfo"]["name"], "");
        assert_eq!(doc["storeInfo"]["email"], "");
        assert_eq!(doc["settings"]["currency"], "USD");
        assert_eq!(doc["settings"]["language"], "en");
        assert_eq!(doc["settings"]["taxRate"], 0.0);
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let mut doc = TenantSettings::initial(TenantId::new(1).unwrap());
        let before = doc.last_updated;
        let patch: SettingsPatch = serde_json::from_value(serde_json::json!({
            "storeInfo": {"name": "Corner Shop"},
            "settings": {"taxRate": 19.0}
        }))
        .unwrap();
        doc.apply(patch);
        assert_eq!(doc.store_info.name, "Corner Shop");
        assert_eq!(doc.store_info.phone, "");
        assert_eq!(doc.settings.tax_rate, 19.0);
        assert_eq!(doc.settings.currency, "USD");
        assert!(doc.last_updated >= before);
    }
}
