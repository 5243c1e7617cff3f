//! Media Dealer Storage Library
//!
//! Storage abstraction over a local filesystem and an S3-compatible object
//! store, plus the [`MediaManager`] that builds keys in front of them.
//!
//! # Storage key format
//!
//! All backends address objects with the same key layout:
//!
//! - **With environment prefix** (default): `{environment}/{root_folder}/{relative_name}`
//! - **Without**: `{root_folder}/{relative_name}`
//!
//! Segments are always joined with `/`. The relative name comes from a
//! caller-supplied naming function. Key generation lives in the `keys`
//! module so every backend sees identical keys.

pub mod blocking;
#[cfg(feature = "storage-s3")]
pub mod client;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod manager;
#[cfg(feature = "storage-s3")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use blocking::BlockingMediaManager;
#[cfg(feature = "storage-s3")]
pub use client::{ObjectClient, ObjectStoreClient};
pub use dealer_core::BackendKind;
pub use factory::{create_media_manager, create_storage};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use manager::{MediaManager, NamingParams, UploadPath};
#[cfg(feature = "storage-s3")]
pub use memory::InMemoryObjectClient;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Download, StorageBackend, StorageError, StorageResult};
