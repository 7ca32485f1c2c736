// handlers/public/auth/mod.rs - Account registration and token acquisition

pub mod login;    // POST /auth/login
pub mod register; // POST /auth/register

pub use login::login_post;
pub use register::register_post;
