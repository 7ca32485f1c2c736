/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::services::error::ServiceError;

/// Identifier of a tenant (one registered account).
///
/// Always positive. Every physical table name and every storage path is derived
/// from this value, so it is only ever taken from a verified token or from an
/// operator command, never from request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TenantId(i64);

impl TenantId {
    pub fn new(value: i64) -> Result<Self, ServiceError> {
        if value <= 0 {
            return Err(ServiceError::validation(format!(
                "tenant id must be a positive integer, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for TenantId {
    type Error = ServiceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for i64 {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role carried by an account and by its token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_rejects_non_positive() {
        assert!(TenantId::new(0).is_err());
        assert!(TenantId::new(-7).is_err());
        assert_eq!(TenantId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn tenant_id_deserializes_through_validation() {
        let id: TenantId = serde_json::from_str("42").unwrap();
        assert_eq!(id.to_string(), "42");
        assert!(serde_json::from_str::<TenantId>("-1").is_err());
    }

    #[test]
    fn role_parses_unknown_as_user() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("owner"), Role::User);
    }
}
