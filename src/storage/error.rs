use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Preview not supported: {0}")]
    UnsupportedPreview(String),

    #[error("File too large: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Export task failed: {0}")]
    Export(String),
}
