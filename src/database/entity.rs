use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::error::ServiceError;

/// The closed set of record types every tenant owns one table for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Customer,
    Product,
    Order,
    Stock,
    Invoice,
    PaymentLog,
    SubordinateWorker,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Customer,
        Entity::Product,
        Entity::Order,
        Entity::Stock,
        Entity::Invoice,
        Entity::PaymentLog,
        Entity::SubordinateWorker,
    ];

    /// Plural snake-case stem used for the physical table name
    pub fn table_stem(self) -> &'static str {
        match self {
            Entity::Customer => "customers",
            Entity::Product => "products",
            Entity::Order => "orders",
            Entity::Stock => "stocks",
            Entity::Invoice => "invoices",
            Entity::PaymentLog => "payment_logs",
            Entity::SubordinateWorker => "subordinate_workers",
        }
    }

    /// Path segment used by the HTTP surface
    pub fn route_segment(self) -> &'static str {
        match self {
            Entity::Customer => "customers",
            Entity::Product => "products",
            Entity::Order => "orders",
            Entity::Stock => "stocks",
            Entity::Invoice => "invoices",
            Entity::PaymentLog => "paymentlogs",
            Entity::SubordinateWorker => "subordinateworkers",
        }
    }

    /// Human label for messages ("Customer not found")
    pub fn label(self) -> &'static str {
        match self {
            Entity::Customer => "Customer",
            Entity::Product => "Product",
            Entity::Order => "Order",
            Entity::Stock => "Stock",
            Entity::Invoice => "Invoice",
            Entity::PaymentLog => "Payment log",
            Entity::SubordinateWorker => "Subordinate worker",
        }
    }
}

impl FromStr for Entity {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let entity = match normalized.as_str() {
            "customers" | "customer" => Entity::Customer,
            "products" | "product" => Entity::Product,
            "orders" | "order" => Entity::Order,
            "stocks" | "stock" => Entity::Stock,
            "invoices" | "invoice" => Entity::Invoice,
            "paymentlogs" | "payment_logs" | "payment_log" | "paymentlog" => Entity::PaymentLog,
            "subordinateworkers" | "subordinate_workers" | "subordinate_worker" | "subordinateworker" => {
                Entity::SubordinateWorker
            }
            _ => return Err(ServiceError::validation(format!("unsupported entity: {}", s))),
        };
        Ok(entity)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_segments_and_snake_case() {
        assert_eq!("paymentlogs".parse::<Entity>().unwrap(), Entity::PaymentLog);
        assert_eq!("payment_logs".parse::<Entity>().unwrap(), Entity::PaymentLog);
        assert_eq!("SubordinateWorkers".parse::<Entity>().unwrap(), Entity::SubordinateWorker);
        for entity in Entity::ALL {
            assert_eq!(entity.route_segment().parse::<Entity>().unwrap(), entity);
            assert_eq!(entity.table_stem().parse::<Entity>().unwrap(), entity);
        }
    }

    #[test]
    fn rejects_anything_outside_the_closed_set() {
        let err = "users".parse::<Entity>().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!("customers_42".parse::<Entity>().is_err());
        assert!("".parse::<Entity>().is_err());
    }
}
