// handlers/elevated/mod.rs - Elevated handlers (administrator role required)
//
// Security Level: JWT with role "admin"
// Route Prefix: /api/admin/*
// Middleware: jwt_auth_middleware, then require_admin_middleware

pub mod accounts;

pub use accounts::*;
