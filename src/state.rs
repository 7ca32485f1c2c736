use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::executor::QueryExecutor;
use crate::database::introspect::SchemaIntrospector;
use crate::database::manager::DatabaseManager;
use crate::database::naming::{SuffixResolver, TableResolver};
use crate::services::accounts::AccountService;
use crate::services::credentials::{CredentialService, JwtCredentials};
use crate::services::crud::CrudEngine;
use crate::services::error::ServiceError;
use crate::services::namespace::NamespaceService;
use crate::services::provisioning::TenantProvisioner;
use crate::services::workers::WorkerService;
use crate::storage::TenantFs;

/// Everything a request handler or CLI command needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    db: DatabaseManager,
    crud: CrudEngine,
    provisioner: TenantProvisioner,
    fs: TenantFs,
    credentials: Arc<dyn CredentialService>,
    accounts: AccountService,
    workers: WorkerService,
    namespace: NamespaceService,
}

impl AppState {
    /// Connect the pool and wire every service. Any failure is a startup failure.
    pub async fn connect(config: AppConfig) -> Result<Self, ServiceError> {
        let db = DatabaseManager::connect(&config.database).await?;
        Self::from_manager(config, db)
    }

    /// Wire services around an existing pool (tests use a lazily connected one)
    pub fn from_pool(config: AppConfig, pool: PgPool) -> Result<Self, ServiceError> {
        Self::from_manager(config, DatabaseManager::from_pool(pool))
    }

    fn from_manager(config: AppConfig, db: DatabaseManager) -> Result<Self, ServiceError> {
        let resolver: Arc<dyn TableResolver> = Arc::new(SuffixResolver);
        let executor = QueryExecutor::new(db.clone(), &config.database);
        let introspector = SchemaIntrospector::new(executor.clone(), resolver.clone());
        let crud = CrudEngine::new(executor.clone(), introspector, resolver.clone(), &config.api);
        let provisioner = TenantProvisioner::new(executor, resolver.clone());
        let fs = TenantFs::new(&config.storage);
        let credentials: Arc<dyn CredentialService> = Arc::new(JwtCredentials::new(&config.security)?);
        let namespace = NamespaceService::new(crud.clone(), fs.clone());
        let workers = WorkerService::new(crud.clone(), credentials.clone(), namespace.clone());
        let accounts = AccountService::new(
            db.clone(),
            credentials.clone(),
            provisioner.clone(),
            fs.clone(),
            config.security.clone(),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                db,
                crud,
                provisioner,
                fs,
                credentials,
                accounts,
                workers,
                namespace,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.inner.db
    }

    pub fn crud(&self) -> &CrudEngine {
        &self.inner.crud
    }

    pub fn introspector(&self) -> &SchemaIntrospector {
        self.inner.crud.introspector()
    }

    pub fn provisioner(&self) -> &TenantProvisioner {
        &self.inner.provisioner
    }

    pub fn fs(&self) -> &TenantFs {
        &self.inner.fs
    }

    pub fn credentials(&self) -> &dyn CredentialService {
        self.inner.credentials.as_ref()
    }

    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    pub fn workers(&self) -> &WorkerService {
        &self.inner.workers
    }

    pub fn namespace(&self) -> &NamespaceService {
        &self.inner.namespace
    }
}
