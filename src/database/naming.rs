//! Physical table naming.
//!
//! Tenants are isolated structurally: each one gets its own set of tables named
//! `<plural_snake>_<tenant id>`. There is no tenant column to filter on, so this
//! module is the single place a physical name may be produced.

use std::fmt;

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::types::TenantId;

/// Postgres truncates identifiers beyond this many bytes
const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated physical table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = name.into();
        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        let starts_with_letter = name.chars().next().map_or(false, |c| c.is_ascii_lowercase());
        if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN || !valid_chars || !starts_with_letter {
            return Err(DatabaseError::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier for SQL text
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

/// Double-quote an identifier that came from outside this module (catalog
/// column names). Embedded quotes are doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps (entity, tenant) to a physical table
pub trait TableResolver: Send + Sync {
    fn resolve(&self, entity: Entity, tenant: TenantId) -> TableName;
}

/// Default `<plural_snake>_<tenant>` convention
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixResolver;

impl TableResolver for SuffixResolver {
    fn resolve(&self, entity: Entity, tenant: TenantId) -> TableName {
        let name = format!("{}_{}", entity.table_stem(), tenant.get());
        // Stems are static lowercase words and the id is a positive integer,
        // so the longest possible name ("subordinate_workers_" + 19 digits) fits.
        TableName(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: i64) -> TenantId {
        TenantId::new(id).unwrap()
    }

    #[test]
    fn resolves_plural_stem_with_tenant_suffix() {
        let resolver = SuffixResolver;
        assert_eq!(resolver.resolve(Entity::Customer, tenant(42)).as_str(), "customers_42");
        assert_eq!(resolver.resolve(Entity::PaymentLog, tenant(7)).as_str(), "payment_logs_7");
        assert_eq!(
            resolver.resolve(Entity::SubordinateWorker, tenant(1)).quoted(),
            "\"subordinate_workers_1\""
        );
    }

    #[test]
    fn resolution_is_stable_and_tenant_distinct() {
        let resolver = SuffixResolver;
        for entity in Entity::ALL {
            let first = resolver.resolve(entity, tenant(5));
            assert_eq!(first, resolver.resolve(entity, tenant(5)));
            assert_ne!(first, resolver.resolve(entity, tenant(50)));
            assert_ne!(resolver.resolve(entity, tenant(1)), resolver.resolve(entity, tenant(11)));
        }
    }

    #[test]
    fn resolved_names_pass_validation_even_for_max_tenant() {
        let resolver = SuffixResolver;
        for entity in Entity::ALL {
            let name = resolver.resolve(entity, tenant(i64::MAX));
            assert!(TableName::new(name.as_str()).is_ok(), "{} rejected", name);
        }
    }

    #[test]
    fn identifiers_with_quotes_are_escaped() {
        assert_eq!(quote_ident("price"), "\"price\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn rejects_injection_shaped_names() {
        assert!(TableName::new("customers_1; DROP TABLE users").is_err());
        assert!(TableName::new("Customers_1").is_err());
        assert!(TableName::new("1customers").is_err());
        assert!(TableName::new("customers\"_1").is_err());
        assert!(TableName::new("").is_err());
        assert!(TableName::new("a".repeat(64)).is_err());
    }
}
