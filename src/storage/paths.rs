//! Resolution of client-supplied relative paths inside a tenant root.

use std::path::{Component, Path, PathBuf};

use super::error::StorageError;

/// Join `relative` under `root`, refusing anything that could leave it.
///
/// Lexical check first (no absolute paths, no `..`, no drive prefixes), then,
/// when the target exists, a canonical check so a symlink cannot point out.
pub async fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, StorageError> {
    let trimmed = relative.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath("path must not be empty".to_string()));
    }
    if trimmed.contains('\0') {
        return Err(StorageError::InvalidPath("path contains a NUL byte".to_string()));
    }

    let candidate = Path::new(trimmed);
    let mut joined = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(format!("{} escapes the tenant root", relative)));
            }
        }
    }
    if joined == root {
        return Err(StorageError::InvalidPath("path must name an entry inside the tenant root".to_string()));
    }

    if let Ok(canonical) = tokio::fs::canonicalize(&joined).await {
        let canonical_root = tokio::fs::canonicalize(root).await?;
        if !canonical.starts_with(&canonical_root) {
            return Err(StorageError::InvalidPath(format!("{} escapes the tenant root", relative)));
        }
    }
    Ok(joined)
}

/// Forward-slash relative path of `path` under `root`, for listings and archives
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_nested_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_within(dir.path(), "invoices/2024/inv-1.pdf").await.unwrap();
        assert_eq!(path, dir.path().join("invoices").join("2024").join("inv-1.pdf"));
        let path = resolve_within(dir.path(), "./notes.txt").await.unwrap();
        assert_eq!(path, dir.path().join("notes.txt"));
    }

    #[tokio::test]
    async fn rejects_traversal_and_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["../other/data.json", "invoices/../../x", "/etc/passwd", "", "  ", "."] {
            assert!(
                matches!(resolve_within(dir.path(), bad).await, Err(StorageError::InvalidPath(_))),
                "{:?} accepted",
                bad
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejects_symlinks_pointing_outside() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "x").unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        assert!(matches!(
            resolve_within(root.path(), "link/secret.txt").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn relative_display_uses_forward_slashes() {
        let root = Path::new("/data/tenants/42");
        assert_eq!(relative_display(root, &root.join("invoices").join("a.pdf")), "invoices/a.pdf");
    }
}
