//! Media Dealer Core Library
//!
//! Types shared by the storage and broadcast crates: the uploaded media handle,
//! deletion receipts, backend selection, environment configuration and the
//! runtime used to offer blocking variants of async operations.

pub mod blocking;
pub mod config;
pub mod media;
pub mod storage_types;

pub use blocking::BlockingRuntime;
pub use config::{BroadcastSettings, Config, ConfigError, S3Overrides, S3Settings};
pub use media::{DeletedFile, MediaDescriptor};
pub use storage_types::BackendKind;
