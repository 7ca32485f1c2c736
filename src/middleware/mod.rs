pub mod auth;
pub mod response;
pub mod validate_account;

pub use auth::{jwt_auth_middleware, require_admin_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use validate_account::validate_account_middleware;
