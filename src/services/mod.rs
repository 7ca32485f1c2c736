pub mod accounts;
pub mod credentials;
pub mod crud;
pub mod error;
pub mod gate;
pub mod namespace;
pub mod provisioning;
pub mod workers;

pub use accounts::AccountService;
pub use credentials::{Claims, CredentialService, JwtCredentials};
pub use crud::CrudEngine;
pub use error::ServiceError;
pub use gate::AccountGate;
pub use namespace::NamespaceService;
pub use provisioning::TenantProvisioner;
pub use workers::WorkerService;
