//! Storage abstraction trait
//!
//! This module defines the StorageBackend trait that all storage backends must implement.

use crate::BackendKind;
use async_trait::async_trait;
use bytes::Bytes;
use dealer_core::{ConfigError, DeletedFile, MediaDescriptor};
use std::io::Cursor;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// True when the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        StorageError::ConfigError(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fully buffered download, positioned at offset 0.
pub type Download = Cursor<Bytes>;

/// Storage abstraction trait
///
/// Implemented by the object-store and local filesystem backends. Keys are
/// `/`-separated strings produced by [`crate::keys::build_storage_key`];
/// every backend must give them the same meaning so callers never depend on
/// which one is configured.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store the descriptor's content at `key`, silently replacing any
    /// existing object.
    async fn upload(&self, key: &str, media: MediaDescriptor) -> StorageResult<()>;

    /// Remove a single object. Fails with [`StorageError::NotFound`] when the
    /// key does not exist.
    async fn delete(&self, key: &str) -> StorageResult<DeletedFile>;

    /// Where the object can be reached: a public URL for the object store,
    /// the key itself for the filesystem.
    fn location(&self, key: &str) -> String;

    /// Entries under `prefix`.
    ///
    /// The object store returns full keys and never the folder marker
    /// `{prefix}/`; the filesystem returns bare entry names.
    async fn list_folder(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// List `prefix` then delete every entry found, returning what was listed.
    ///
    /// Not atomic: an object written under `prefix` between the list and the
    /// delete may be removed too, and one written afterwards survives.
    async fn delete_folder(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Load the whole object into memory.
    async fn download(&self, key: &str) -> StorageResult<Download>;

    /// Mint a time-limited GET URL. With `verify` the object's existence is
    /// checked first and a missing key fails with [`StorageError::NotFound`].
    async fn signed_url(&self, key: &str, verify: bool) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> BackendKind;
}
