use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use filecask_core::StorageBackend;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/filecask/data")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with path traversal sequences that could escape the
    /// base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(storage_key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from_io)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path)
            .await
            .map_err(StorageError::from_io)?;

        file.write_all(&data).await.map_err(StorageError::from_io)?;

        file.sync_all().await.map_err(StorageError::from_io)?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(StorageError::from_io)?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage get successful"
        );

        Ok(data)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(StorageError::from_io)?;

        tracing::debug!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from_path = self.key_to_path(from_key)?;
        let to_path = self.key_to_path(to_key)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path)
            .await
            .map_err(StorageError::from_io)?;

        tracing::debug!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let root = self.key_to_path(prefix.trim_end_matches('/'))?;

        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(StorageError::from_io)?;
            while let Some(entry) = entries.next_entry().await.map_err(StorageError::from_io)? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(StorageError::from_io)?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_path) {
                    keys.push(rel.to_string_lossy().into_owned());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"test data".to_vec();
        storage
            .put("owner/files/abc/original", data.clone(), "text/plain")
            .await
            .unwrap();

        let downloaded = storage.get("owner/files/abc/original").await.unwrap();
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_put_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("k/original", b"first".to_vec(), "text/plain")
            .await
            .unwrap();
        storage
            .put("k/original", b"second".to_vec(), "text/plain")
            .await
            .unwrap();

        assert_eq!(storage.get("k/original").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.delete("nonexistent/file.txt").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("missing/original").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("here/original", b"x".to_vec(), "text/plain")
            .await
            .unwrap();

        assert!(storage.exists("here/original").await.unwrap());
        assert!(!storage.exists("gone/original").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"original content".to_vec();
        storage
            .put("a/original", data.clone(), "text/plain")
            .await
            .unwrap();

        storage.copy("a/original", "a/derivatives/original-copy").await.unwrap();

        let copied = storage.get("a/derivatives/original-copy").await.unwrap();
        assert_eq!(data, copied);
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.copy("nope/original", "nope/copy").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("o/files/1/original", b"a".to_vec(), "text/plain")
            .await
            .unwrap();
        storage
            .put("o/files/1/derivatives/extracted-text", b"b".to_vec(), "text/plain")
            .await
            .unwrap();
        storage
            .put("o/files/2/original", b"c".to_vec(), "text/plain")
            .await
            .unwrap();

        let keys = storage.list("o/files/1/").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "o/files/1/derivatives/extracted-text".to_string(),
                "o/files/1/original".to_string(),
            ]
        );

        let all = storage.list("").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let keys = storage.list("nothing/here/").await.unwrap();
        assert!(keys.is_empty());
    }
}
