//! Storage abstraction trait
//!
//! All storage backends (S3, local filesystem) implement this trait so the
//! API layer can hand off finished artifacts without coupling to a backend.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction for finished artifacts.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload an artifact under a fresh key and return its public URL.
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Delete an artifact by its storage key.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;
}
