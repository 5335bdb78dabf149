//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must
//! implement, and the error split the worker's retry policy keys off.

use async_trait::async_trait;
use filecask_core::StorageBackend;
use thiserror::Error;

/// Storage operation errors.
///
/// The transient/permanent split is part of the contract: the worker loop
/// retries `Transient` errors with bounded attempts and fails the job
/// immediately on `Permanent` ones (quota, permissions, invalid key).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Permanent storage error: {0}")]
    Permanent(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether the worker loop should retry the failed operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }

    /// Classify an IO error from a filesystem-backed store.
    ///
    /// Permission problems won't resolve on retry; everything else
    /// (interrupted syscalls, contention, slow disks) is worth retrying.
    pub fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::Permanent(err.to_string()),
            _ => StorageError::Transient(err.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Callers address bytes only through the deterministic key scheme (see the
/// crate root documentation); backends have no knowledge of jobs or files
/// above the byte level.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write bytes at a key, overwriting any existing object.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Read the bytes at a key. Missing objects are `NotFound`.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete the object at a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Copy an object from one key to another, overwriting the destination.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// List the keys under a prefix. Finite; order is deterministic.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check if an object exists at a key.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Transient("timeout".to_string()).is_transient());
        assert!(!StorageError::Permanent("quota exceeded".to_string()).is_transient());
        assert!(!StorageError::NotFound("k".to_string()).is_transient());
        assert!(!StorageError::InvalidKey("../k".to_string()).is_transient());
    }

    #[test]
    fn test_io_error_classification() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            StorageError::from_io(denied),
            StorageError::Permanent(_)
        ));

        let interrupted = std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted");
        assert!(StorageError::from_io(interrupted).is_transient());

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(
            StorageError::from_io(missing),
            StorageError::NotFound(_)
        ));
    }
}
