// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: no /api prefix (/, /health, /auth/*)

pub mod auth;
pub mod system;

pub use auth::*;
pub use system::*;
