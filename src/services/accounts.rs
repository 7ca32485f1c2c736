//! Registered accounts. Each account is one tenant: its id names the tenant's
//! tables and its storage namespace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::services::credentials::{CredentialService, IssuedToken};
use crate::services::error::ServiceError;
use crate::services::gate::{AccountGate, GateStatus};
use crate::services::provisioning::{lost_create_race, TenantProvisioner};
use crate::storage::TenantFs;
use crate::types::{Role, TenantId};

const MIN_PASSWORD_LEN: usize = 6;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "users" (
    "id" BIGSERIAL PRIMARY KEY,
    "email" VARCHAR(255) NOT NULL UNIQUE,
    "password_hash" TEXT NOT NULL,
    "name" VARCHAR(255) NOT NULL,
    "role" VARCHAR(20) NOT NULL DEFAULT 'user',
    "is_suspended" BOOLEAN NOT NULL DEFAULT FALSE,
    "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, role, is_suspended, created_at";

#[derive(Debug, Clone, FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_suspended: bool,
    created_at: DateTime<Utc>,
}

/// Account as shown to clients and administrators
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for Account {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            role: Role::parse(&record.role),
            email: record.email,
            name: record.name,
            is_suspended: record.is_suspended,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub account: Account,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    pub id: i64,
    pub tables_dropped: usize,
    pub namespace_removed: bool,
}

#[derive(Clone)]
pub struct AccountService {
    db: DatabaseManager,
    credentials: Arc<dyn CredentialService>,
    provisioner: TenantProvisioner,
    fs: TenantFs,
    security: SecurityConfig,
    gate: AccountGate,
}

impl AccountService {
    pub fn new(
        db: DatabaseManager,
        credentials: Arc<dyn CredentialService>,
        provisioner: TenantProvisioner,
        fs: TenantFs,
        security: SecurityConfig,
    ) -> Self {
        let gate = AccountGate::new(Duration::from_secs(security.account_check_secs));
        Self {
            db,
            credentials,
            provisioner,
            fs,
            security,
            gate,
        }
    }

    /// Create the shared `users` table if needed. Called once at startup.
    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        match sqlx::query(CREATE_USERS_TABLE).execute(self.db.pool()).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let err = DatabaseError::from(err);
                if lost_create_race(&err) {
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Account, ServiceError> {
        let email = normalize_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let name = match request.name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };
        let role = if self.security.is_admin_email(&email) { Role::Admin } else { Role::User };
        let hash = self.credentials.hash_password(&request.password)?;

        let sql = format!(
            "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO NOTHING RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(&email)
            .bind(&hash)
            .bind(&name)
            .bind(role.as_str())
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| ServiceError::conflict("an account with this email already exists"))?;

        let tenant = TenantId::new(record.id)?;
        info!(tenant = %tenant, role = role.as_str(), "Registered account");
        self.gate.admit(tenant);
        self.provisioner.provision(tenant).await?;
        self.fs.ensure_namespace(tenant).await?;
        Ok(record.into())
    }

    /// Verify credentials, self-heal the tenant's tables and namespace, issue a token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let email = request.email.trim().to_lowercase();
        let invalid = || ServiceError::unauthorized("invalid email or password");

        let record = self.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !self.credentials.verify_password(&request.password, &record.password_hash)? {
            return Err(invalid());
        }
        if record.is_suspended {
            return Err(ServiceError::forbidden("account is suspended"));
        }

        let tenant = TenantId::new(record.id)?;
        self.gate.admit(tenant);
        self.provisioner.provision(tenant).await?;
        self.fs.ensure_namespace_best_effort(tenant).await;

        let mut account = Account::from(record);
        if self.security.is_admin_email(&account.email) {
            account.role = Role::Admin;
        }
        let IssuedToken { token, expires_at } = self.credentials.issue_token(tenant, &account.email, account.role)?;
        info!(tenant = %tenant, "Login succeeded");
        Ok(LoginResponse {
            token,
            expires_at,
            account,
        })
    }

    pub fn gate(&self) -> &AccountGate {
        &self.gate
    }

    /// Refuse tenants whose account row no longer exists. Runs before every
    /// authenticated request, so nothing is rebuilt for a deleted tenant.
    pub async fn verify_active(&self, tenant: TenantId) -> Result<(), ServiceError> {
        match self.gate.status(tenant) {
            GateStatus::Live => Ok(()),
            GateStatus::Revoked => Err(account_gone()),
            GateStatus::Unknown => match self.find_record(tenant.get()).await? {
                Some(_) => {
                    self.gate.admit(tenant);
                    Ok(())
                }
                None => {
                    warn!(tenant = %tenant, "Token presented for a deleted account");
                    self.gate.revoke(tenant);
                    Err(account_gone())
                }
            },
        }
    }

    pub async fn find(&self, id: i64) -> Result<Option<Account>, ServiceError> {
        Ok(self.find_record(id).await?.map(Account::from))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, ServiceError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", ACCOUNT_COLUMNS);
        let records: Vec<UserRecord> = sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;
        Ok(records.into_iter().map(Account::from).collect())
    }

    pub async fn suspend(&self, id: i64) -> Result<Account, ServiceError> {
        let record = self.find_record(id).await?.ok_or_else(account_not_found)?;
        if Role::parse(&record.role) == Role::Admin || self.security.is_admin_email(&record.email) {
            return Err(ServiceError::forbidden("administrator accounts cannot be suspended"));
        }
        self.set_suspended(id, true).await
    }

    pub async fn unsuspend(&self, id: i64) -> Result<Account, ServiceError> {
        self.set_suspended(id, false).await
    }

    /// Tear down tables, then the namespace, then the account row. Every step
    /// is idempotent, so a failed teardown is finished by calling this again.
    pub async fn delete_account(&self, id: i64) -> Result<DeletionReport, ServiceError> {
        let record = self.find_record(id).await?.ok_or_else(account_not_found)?;
        if Role::parse(&record.role) == Role::Admin || self.security.is_admin_email(&record.email) {
            return Err(ServiceError::forbidden("administrator accounts cannot be deleted"));
        }
        let tenant = TenantId::new(record.id)?;

        // Outstanding tokens stop working before teardown starts
        self.gate.revoke(tenant);
        let tables = self.provisioner.deprovision(tenant).await?;
        let namespace_removed = self.fs.delete_namespace(tenant).await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        info!(tenant = %tenant, tables = tables.len(), namespace_removed, "Deleted account");
        Ok(DeletionReport {
            id,
            tables_dropped: tables.len(),
            namespace_removed,
        })
    }

    async fn set_suspended(&self, id: i64, suspended: bool) -> Result<Account, ServiceError> {
        let sql = format!(
            "UPDATE users SET is_suspended = $2 WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(id)
            .bind(suspended)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(account_not_found)?;
        if suspended {
            warn!(account = id, "Account suspended");
        } else {
            info!(account = id, "Account unsuspended");
        }
        Ok(record.into())
    }

    async fn find_record(&self, id: i64) -> Result<Option<UserRecord>, ServiceError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(self.db.pool()).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", ACCOUNT_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(email).fetch_optional(self.db.pool()).await?)
    }
}

fn account_not_found() -> ServiceError {
    ServiceError::not_found("account not found")
}

fn account_gone() -> ServiceError {
    ServiceError::unauthorized("account no longer exists")
}

fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ServiceError::validation("a valid email address is required")),
    }
}
