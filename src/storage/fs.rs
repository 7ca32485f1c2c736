//! Per-tenant filesystem namespace.
//!
//! Layout under `<storage root>/tenant_<id>/`:
//!
//! ```text
//! archive/            archived documents
//! archive/data.json   subordinate-worker snapshot
//! images-products/
//! invoices/
//! data.json           store settings
//! ```
//!
//! Missing pieces are recreated by `ensure_namespace`, which every operation
//! touching the tree calls first. Existing files are never overwritten by it.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::error::StorageError;
use super::export::ByteStream;
use super::paths::{relative_display, resolve_within};
use super::settings::{SettingsPatch, TenantSettings};
use super::snapshot::ArchiveSnapshot;
use crate::config::StorageConfig;
use crate::types::TenantId;

pub const ARCHIVE_DIR: &str = "archive";
pub const IMAGES_DIR: &str = "images-products";
pub const INVOICES_DIR: &str = "invoices";
pub const DATA_FILE: &str = "data.json";

const DOWNLOAD_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a namespace listing
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    pub path: String,
    pub size: u64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub name: String,
    pub path: String,
    pub size: u64,
}

#[derive(Clone, Debug)]
pub struct TenantFs {
    root: PathBuf,
    preview_max_bytes: u64,
    preview_extensions: Vec<String>,
}

impl TenantFs {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root_dir.clone(),
            preview_max_bytes: config.preview_max_bytes,
            preview_extensions: config
                .preview_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Base directory of one tenant. Derived only from the tenant id.
    pub fn tenant_root(&self, tenant: TenantId) -> PathBuf {
        self.root.join(format!("tenant_{}", tenant.get()))
    }

    /// Create whatever part of the layout is missing. Returns the pieces that
    /// had to be created (empty when the namespace was already whole).
    pub async fn ensure_namespace(&self, tenant: TenantId) -> Result<Vec<&'static str>, StorageError> {
        let base = self.tenant_root(tenant);
        let mut repaired = Vec::new();

        if !is_dir(&base).await {
            tokio::fs::create_dir_all(&base).await?;
            repaired.push(".");
        }
        for dir in [ARCHIVE_DIR, IMAGES_DIR, INVOICES_DIR] {
            let path = base.join(dir);
            if !is_dir(&path).await {
                tokio::fs::create_dir_all(&path).await?;
                repaired.push(dir);
            }
        }
        if write_new_json(&base.join(DATA_FILE), &TenantSettings::initial(tenant)).await? {
            repaired.push(DATA_FILE);
        }
        let snapshot_path = base.join(ARCHIVE_DIR).join(DATA_FILE);
        if write_new_json(&snapshot_path, &ArchiveSnapshot::empty(tenant)).await? {
            repaired.push("archive/data.json");
        }

        if !repaired.is_empty() {
            info!(tenant = %tenant, repaired = ?repaired, "Namespace pieces created");
        }
        Ok(repaired)
    }

    /// Read-path variant: a failure to repair is logged, not returned
    pub async fn ensure_namespace_best_effort(&self, tenant: TenantId) {
        if let Err(e) = self.ensure_namespace(tenant).await {
            warn!(tenant = %tenant, "Namespace re-verification failed: {}", e);
        }
    }

    /// Move a file from the tenant tree into `archive/`
    pub async fn archive_document(&self, tenant: TenantId, file_name: &str) -> Result<String, StorageError> {
        self.ensure_namespace(tenant).await?;
        let base = self.tenant_root(tenant);
        let source = resolve_within(&base, file_name).await?;

        if !is_file(&source).await {
            return Err(StorageError::NotFound(file_name.to_string()));
        }
        let archive_dir = base.join(ARCHIVE_DIR);
        if source.parent() == Some(archive_dir.as_path()) {
            return Err(StorageError::InvalidPath(format!("{} is already archived", file_name)));
        }
        if source == base.join(DATA_FILE) {
            return Err(StorageError::InvalidPath("store settings cannot be archived".to_string()));
        }

        let file_os_name = source
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(file_name.to_string()))?;
        let mut target = archive_dir.join(file_os_name);
        if tokio::fs::try_exists(&target).await? || file_os_name == DATA_FILE {
            let stamped = format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), file_os_name.to_string_lossy());
            target = archive_dir.join(stamped);
        }

        tokio::fs::rename(&source, &target).await?;
        let archived = relative_display(&base, &target);
        info!(tenant = %tenant, from = file_name, to = %archived, "Archived document");
        Ok(archived)
    }

    /// Remove the whole tenant tree. Missing tree is not an error.
    pub async fn delete_namespace(&self, tenant: TenantId) -> Result<bool, StorageError> {
        match tokio::fs::remove_dir_all(self.tenant_root(tenant)).await {
            Ok(()) => {
                info!(tenant = %tenant, "Deleted namespace");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Recursive listing, directories first then by name
    pub async fn list_tree(&self, tenant: TenantId) -> Result<Vec<TreeEntry>, StorageError> {
        self.ensure_namespace_best_effort(tenant).await;
        let base = self.tenant_root(tenant);
        walk(base.clone(), base).await
    }

    /// Text content of a small allowlisted file
    pub async fn preview_file(&self, tenant: TenantId, relative: &str) -> Result<FilePreview, StorageError> {
        self.ensure_namespace_best_effort(tenant).await;
        let base = self.tenant_root(tenant);
        let path = resolve_within(&base, relative).await?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !self.preview_extensions.iter().any(|e| *e == extension) {
            return Err(StorageError::UnsupportedPreview(format!(
                "files of type .{} cannot be previewed",
                extension
            )));
        }

        let meta = file_metadata(&path, relative).await?;
        if meta.len() > self.preview_max_bytes {
            return Err(StorageError::TooLarge(format!(
                "{} is {} bytes, preview limit is {}",
                relative,
                meta.len(),
                self.preview_max_bytes
            )));
        }

        let bytes = tokio::fs::read(&path).await?;
        Ok(FilePreview {
            path: relative_display(&base, &path),
            size: meta.len(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Metadata plus a chunked stream of the file, for arbitrarily large downloads
    pub async fn open_download(&self, tenant: TenantId, relative: &str) -> Result<(FileMeta, ByteStream), StorageError> {
        self.ensure_namespace_best_effort(tenant).await;
        let base = self.tenant_root(tenant);
        let path = resolve_within(&base, relative).await?;
        let meta = file_metadata(&path, relative).await?;

        let file = tokio::fs::File::open(&path).await?;
        let stream = futures::stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; DOWNLOAD_CHUNK];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            Ok(Some((buf, file)))
        });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let info = FileMeta {
            name,
            path: relative_display(&base, &path),
            size: meta.len(),
        };
        debug!(tenant = %tenant, path = %info.path, size = info.size, "Opened download");
        Ok((info, Box::pin(stream)))
    }

    pub async fn read_settings(&self, tenant: TenantId) -> Result<TenantSettings, StorageError> {
        self.ensure_namespace_best_effort(tenant).await;
        let bytes = tokio::fs::read(self.tenant_root(tenant).join(DATA_FILE)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn update_settings(&self, tenant: TenantId, patch: SettingsPatch) -> Result<TenantSettings, StorageError> {
        self.ensure_namespace(tenant).await?;
        let path = self.tenant_root(tenant).join(DATA_FILE);
        let mut settings: TenantSettings = serde_json::from_slice(&tokio::fs::read(&path).await?)?;
        settings.apply(patch);
        replace_json(&path, &settings).await?;
        Ok(settings)
    }

    /// Overwrite `archive/data.json`
    pub async fn write_snapshot(&self, tenant: TenantId, snapshot: &ArchiveSnapshot) -> Result<(), StorageError> {
        self.ensure_namespace(tenant).await?;
        let path = self.tenant_root(tenant).join(ARCHIVE_DIR).join(DATA_FILE);
        replace_json(&path, snapshot).await
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn file_metadata(path: &Path, relative: &str) -> Result<std::fs::Metadata, StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta),
        Ok(_) => Err(StorageError::NotFound(relative.to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(relative.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` only if `path` does not exist yet. Returns whether it wrote.
async fn write_new_json<T: Serialize>(path: &Path, value: &T) -> Result<bool, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    let mut file = match tokio::fs::OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(&body).await?;
    file.flush().await?;
    Ok(true)
}

/// Replace `path` through a sibling temp file and rename
async fn replace_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn walk(base: PathBuf, dir: PathBuf) -> BoxFuture<'static, Result<Vec<TreeEntry>, StorageError>> {
    async move {
        let mut entries = Vec::new();
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = reader.next_entry().await? {
            let path = item.path();
            let meta = tokio::fs::symlink_metadata(&path).await?;
            if meta.file_type().is_symlink() {
                continue;
            }
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            let name = item.file_name().to_string_lossy().into_owned();
            let relative = relative_display(&base, &path);

            if meta.is_dir() {
                let children = walk(base.clone(), path).await?;
                entries.push(TreeEntry {
                    name,
                    path: relative,
                    kind: EntryKind::Directory,
                    size: children.iter().map(|c| c.size).sum(),
                    modified,
                    children,
                });
            } else {
                entries.push(TreeEntry {
                    name,
                    path: relative,
                    kind: EntryKind::File,
                    size: meta.len(),
                    modified,
                    children: Vec::new(),
                });
            }
        }

        entries.sort_by(|a, b| {
            (a.kind != EntryKind::Directory, &a.name).cmp(&(b.kind != EntryKind::Directory, &b.name))
        });
        Ok(entries)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::TempDir;

    fn fs_in(dir: &TempDir) -> TenantFs {
        TenantFs::new(&StorageConfig {
            root_dir: dir.path().to_path_buf(),
            preview_max_bytes: 64,
            preview_extensions: vec!["txt".into(), ".JSON".into()],
        })
    }

    fn tenant() -> TenantId {
        TenantId::new(42).unwrap()
    }

    #[tokio::test]
    async fn ensure_creates_full_layout_once() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);

        let repaired = fs.ensure_namespace(tenant()).await.unwrap();
        assert_eq!(
            repaired,
            vec![".", ARCHIVE_DIR, IMAGES_DIR, INVOICES_DIR, DATA_FILE, "archive/data.json"]
        );
        let base = fs.tenant_root(tenant());
        assert!(base.join(IMAGES_DIR).is_dir());
        assert!(base.join(ARCHIVE_DIR).join(DATA_FILE).is_file());

        assert!(fs.ensure_namespace(tenant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_recreates_only_missing_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let base = fs.tenant_root(tenant());

        std::fs::write(base.join(IMAGES_DIR).join("chair.png"), b"png").unwrap();
        std::fs::remove_dir_all(base.join(INVOICES_DIR)).unwrap();
        let settings_before = std::fs::read(base.join(DATA_FILE)).unwrap();

        let repaired = fs.ensure_namespace(tenant()).await.unwrap();
        assert_eq!(repaired, vec![INVOICES_DIR]);
        assert!(base.join(INVOICES_DIR).is_dir());
        assert_eq!(std::fs::read(base.join(IMAGES_DIR).join("chair.png")).unwrap(), b"png");
        assert_eq!(std::fs::read(base.join(DATA_FILE)).unwrap(), settings_before);
    }

    #[tokio::test]
    async fn ensure_restores_missing_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        std::fs::remove_file(fs.tenant_root(tenant()).join(DATA_FILE)).unwrap();

        assert_eq!(fs.ensure_namespace(tenant()).await.unwrap(), vec![DATA_FILE]);
        assert_eq!(fs.read_settings(tenant()).await.unwrap().user_id, 42);
    }

    #[tokio::test]
    async fn archive_moves_file_and_requires_existence() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let base = fs.tenant_root(tenant());
        std::fs::write(base.join("contract.txt"), "terms").unwrap();

        let archived = fs.archive_document(tenant(), "contract.txt").await.unwrap();
        assert_eq!(archived, "archive/contract.txt");
        assert!(!base.join("contract.txt").exists());
        assert_eq!(std::fs::read_to_string(base.join(ARCHIVE_DIR).join("contract.txt")).unwrap(), "terms");

        assert!(matches!(
            fs.archive_document(tenant(), "contract.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            fs.archive_document(tenant(), "../tenant_7/data.json").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn settings_file_cannot_be_archived() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let patch: SettingsPatch =
            serde_json::from_value(serde_json::json!({"storeInfo": {"phone": "0700"}})).unwrap();
        fs.update_settings(tenant(), patch).await.unwrap();

        assert!(matches!(
            fs.archive_document(tenant(), DATA_FILE).await,
            Err(StorageError::InvalidPath(_))
        ));
        assert_eq!(fs.read_settings(tenant()).await.unwrap().store_info.phone, "0700");

        std::fs::write(fs.tenant_root(tenant()).join(INVOICES_DIR).join(DATA_FILE), "{}").unwrap();
        let archived = fs.archive_document(tenant(), "invoices/data.json").await.unwrap();
        assert_ne!(archived, "archive/data.json");
    }

    #[tokio::test]
    async fn archive_never_clobbers_existing_archived_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let base = fs.tenant_root(tenant());
        std::fs::write(base.join(ARCHIVE_DIR).join("memo.txt"), "old").unwrap();
        std::fs::write(base.join(INVOICES_DIR).join("memo.txt"), "new").unwrap();

        let archived = fs.archive_document(tenant(), "invoices/memo.txt").await.unwrap();
        assert_ne!(archived, "archive/memo.txt");
        assert_eq!(std::fs::read_to_string(base.join(ARCHIVE_DIR).join("memo.txt")).unwrap(), "old");
    }

    #[tokio::test]
    async fn delete_namespace_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        assert!(fs.delete_namespace(tenant()).await.unwrap());
        assert!(!fs.tenant_root(tenant()).exists());
        assert!(!fs.delete_namespace(tenant()).await.unwrap());
    }

    #[tokio::test]
    async fn tree_lists_directories_first_with_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        std::fs::write(fs.tenant_root(tenant()).join(INVOICES_DIR).join("inv-1.pdf"), b"%PDF").unwrap();

        let tree = fs.list_tree(tenant()).await.unwrap();
        let names: Vec<_> = tree.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![ARCHIVE_DIR, IMAGES_DIR, INVOICES_DIR, DATA_FILE]);
        let invoices = &tree[2];
        assert_eq!(invoices.kind, EntryKind::Directory);
        assert_eq!(invoices.children[0].path, "invoices/inv-1.pdf");
        assert_eq!(invoices.size, 4);
    }

    #[tokio::test]
    async fn preview_enforces_allowlist_and_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let base = fs.tenant_root(tenant());
        std::fs::write(base.join("notes.txt"), "hello").unwrap();
        std::fs::write(base.join("big.txt"), "x".repeat(65)).unwrap();
        std::fs::write(base.join("photo.png"), b"png").unwrap();

        let preview = fs.preview_file(tenant(), "notes.txt").await.unwrap();
        assert_eq!(preview.content, "hello");
        assert!(matches!(fs.preview_file(tenant(), "big.txt").await, Err(StorageError::TooLarge(_))));
        assert!(matches!(
            fs.preview_file(tenant(), "photo.png").await,
            Err(StorageError::UnsupportedPreview(_))
        ));
        assert!(matches!(fs.preview_file(tenant(), "gone.txt").await, Err(StorageError::NotFound(_))));
        assert!(fs.preview_file(tenant(), DATA_FILE).await.is_err(), "settings exceed the 64 byte cap");
    }

    #[tokio::test]
    async fn download_streams_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        fs.ensure_namespace(tenant()).await.unwrap();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(fs.tenant_root(tenant()).join(IMAGES_DIR).join("big.bin"), &payload).unwrap();

        let (meta, mut stream) = fs.open_download(tenant(), "images-products/big.bin").await.unwrap();
        assert_eq!(meta.size, payload.len() as u64);
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend(chunk.unwrap());
        }
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn settings_update_persists_and_refreshes_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let fs = fs_in(&dir);
        let patch: SettingsPatch =
            serde_json::from_value(serde_json::json!({"storeInfo": {"phone": "0700"}})).unwrap();
        let updated = fs.update_settings(tenant(), patch).await.unwrap();
        assert_eq!(updated.store_info.phone, "0700");
        let reread = fs.read_settings(tenant()).await.unwrap();
        assert_eq!(reread, updated);
    }
}
