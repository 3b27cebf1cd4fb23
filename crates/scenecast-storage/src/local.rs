use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for artifact storage
    /// * `base_url` - Base URL the directory is served under
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(storage_key))
    }

    fn generate_key(filename: &str) -> String {
        format!("compositions/{}-{}", Uuid::new_v4(), filename)
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let key = Self::generate_key(filename);
        let path = self.key_to_path(&key)?;
        self.ensure_parent_dir(&path).await?;

        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(key = %key, path = %path.display(), "Artifact written to local storage");
        Ok(self.generate_url(&key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_url() {
        let dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(dir.path(), "http://localhost:8890/media/".to_string())
            .await
            .expect("storage");

        let url = storage
            .upload("output.mp4", "video/mp4", b"not really mp4".to_vec())
            .await
            .expect("upload");

        assert!(url.starts_with("http://localhost:8890/media/compositions/"));
        assert!(url.ends_with("-output.mp4"));

        let key = url
            .strip_prefix("http://localhost:8890/media/")
            .expect("key");
        assert!(dir.path().join(key).exists());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(dir.path(), "http://localhost/media".to_string())
            .await
            .expect("storage");

        let err = storage.delete("../outside.mp4").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
