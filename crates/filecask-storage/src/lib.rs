//! Filecask Storage Library
//!
//! Content-addressed byte storage behind the `Storage` trait, with local
//! filesystem and S3 implementations.
//!
//! # Storage key format
//!
//! Keys are deterministic functions of (owner, file id, artifact), so
//! re-running a pipeline stage overwrites rather than orphans data:
//!
//! - **Original upload**: `{owner}/files/{file_id}/original`
//! - **Derivatives**: `{owner}/files/{file_id}/derivatives/{kind}`
//! - **Summary document**: `{owner}/files/{file_id}/ai/summary.md`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends and callers stay
//! consistent. This layout is a durable contract that external tooling
//! (CLI scripts, search indexing) may depend on.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod retry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use filecask_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use retry::with_storage_retries;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
