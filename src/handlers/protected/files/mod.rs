// handlers/protected/files/mod.rs - Tenant filesystem namespace
//
// Every path parameter is relative to the caller's own namespace root and is
// resolved by the storage layer, which rejects anything that leaves it.

pub mod archive;
pub mod settings;
pub mod transfer;
pub mod tree;

pub use archive::archive_post;
pub use settings::{settings_get, settings_patch};
pub use transfer::{download_get, export_get};
pub use tree::{preview_get, tree_get};
