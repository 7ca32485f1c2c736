pub mod error;
pub mod export;
pub mod fs;
pub mod paths;
pub mod settings;
pub mod snapshot;

pub use error::StorageError;
pub use export::{export_stream, ByteStream, DumpSpool, EntityDump};
pub use fs::{EntryKind, FileMeta, FilePreview, TenantFs, TreeEntry};
pub use settings::{SettingsPatch, TenantSettings};
pub use snapshot::ArchiveSnapshot;
