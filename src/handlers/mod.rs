// handlers/mod.rs - 3-tier handler layout
//
// Public (no auth) → Protected (JWT auth) → Elevated (admin JWT)

pub mod elevated; // /api/admin/*
pub mod protected; // /api/*
pub mod public; // /, /health, /auth/*
