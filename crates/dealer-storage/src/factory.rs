#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{BackendKind, MediaManager, StorageBackend, StorageResult, UploadPath};
use dealer_core::Config;
#[cfg(feature = "storage-s3")]
use dealer_core::S3Settings;
use std::sync::Arc;

/// Create a storage backend based on configuration
///
/// The object store is configured eagerly: missing bucket, credentials or
/// region fail here, before any request is made.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn StorageBackend>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        BackendKind::S3 => {
            let settings = S3Settings::try_from(config.s3().clone())?;
            let storage = S3Storage::new(&settings)?;

            tracing::info!(
                bucket = %settings.bucket,
                region = %settings.region,
                "Using S3 storage backend"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        BackendKind::S3 => Err(crate::StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        BackendKind::Local => {
            let storage = match config.local_storage_path() {
                Some(base_dir) => LocalStorage::with_base_dir(base_dir),
                None => LocalStorage::new(),
            };

            tracing::info!(
                base_dir = ?config.local_storage_path(),
                "Using local storage backend"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        BackendKind::Local => Err(crate::StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Build a [`MediaManager`] over the configured backend, prefixing keys with
/// the configured environment.
pub fn create_media_manager(
    config: &Config,
    naming: impl UploadPath + 'static,
) -> StorageResult<MediaManager> {
    let backend = create_storage(config)?;
    Ok(MediaManager::new(backend, config.environment()).with_naming(naming))
}
