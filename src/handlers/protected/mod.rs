// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: JWT Authentication Required
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects `Extension<AuthUser>`; the tenant id
// used by every handler comes from that extension only.

pub mod auth;     // Token introspection
pub mod data;     // Entity CRUD
pub mod describe; // Live column metadata
pub mod files;    // Tenant filesystem namespace
pub mod workers;  // Subordinate-worker views

pub use auth::*;
pub use data::*;
pub use describe::*;
pub use files::*;
pub use workers::*;
