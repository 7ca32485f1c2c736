//! In-process memory of which tenants still have an account behind them.
//!
//! Tokens outlive accounts, so the request path asks this gate before doing
//! anything on a tenant's behalf. Confirmed tenants are remembered for a while;
//! deleted ones are remembered until the process exits.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::types::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Account confirmed recently
    Live,
    /// Account deleted by this process
    Revoked,
    /// Nothing recent is known; ask the database
    Unknown,
}

#[derive(Default)]
struct Seen {
    live: HashMap<TenantId, Instant>,
    revoked: HashSet<TenantId>,
}

#[derive(Clone)]
pub struct AccountGate {
    seen: Arc<RwLock<Seen>>,
    ttl: Duration,
}

impl AccountGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Arc::new(RwLock::new(Seen::default())),
            ttl,
        }
    }

    pub fn status(&self, tenant: TenantId) -> GateStatus {
        let seen = self.seen.read().unwrap_or_else(PoisonError::into_inner);
        if seen.revoked.contains(&tenant) {
            return GateStatus::Revoked;
        }
        match seen.live.get(&tenant) {
            Some(at) if at.elapsed() < self.ttl => GateStatus::Live,
            _ => GateStatus::Unknown,
        }
    }

    /// Record that the account exists
    pub fn admit(&self, tenant: TenantId) {
        let mut seen = self.seen.write().unwrap_or_else(PoisonError::into_inner);
        seen.revoked.remove(&tenant);
        seen.live.insert(tenant, Instant::now());
    }

    /// Record that the account is gone
    pub fn revoke(&self, tenant: TenantId) {
        let mut seen = self.seen.write().unwrap_or_else(PoisonError::into_inner);
        seen.live.remove(&tenant);
        seen.revoked.insert(tenant);
    }
}
