//! Media manager: key construction in front of a storage backend.

use crate::blocking::BlockingMediaManager;
use crate::keys::build_storage_key;
use crate::traits::{Download, StorageBackend, StorageError, StorageResult};
use crate::BackendKind;
use dealer_core::{DeletedFile, MediaDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Extra values a naming function may use, e.g. an owning entity's id.
pub type NamingParams = HashMap<String, String>;

/// Derives the relative name of an upload from its descriptor.
///
/// Implemented for any `Fn(&MediaDescriptor, &NamingParams) -> String`.
pub trait UploadPath: Send + Sync {
    fn relative_name(&self, media: &MediaDescriptor, params: &NamingParams) -> String;
}

impl<F> UploadPath for F
where
    F: Fn(&MediaDescriptor, &NamingParams) -> String + Send + Sync,
{
    fn relative_name(&self, media: &MediaDescriptor, params: &NamingParams) -> String {
        self(media, params)
    }
}

/// Stable entry point for storing, reading and removing media.
///
/// Uploads and folder operations go through [`build_storage_key`]; delete,
/// location, download and signed URLs take the key returned by
/// [`MediaManager::upload`].
#[derive(Clone)]
pub struct MediaManager {
    naming: Option<Arc<dyn UploadPath>>,
    root_folder: String,
    environment: String,
    add_environment_prefix: bool,
    backend: Arc<dyn StorageBackend>,
}

impl MediaManager {
    /// Manager without a naming function, rooted at the bucket or working
    /// directory, prefixing keys with `environment`.
    pub fn new(backend: Arc<dyn StorageBackend>, environment: impl Into<String>) -> Self {
        Self {
            naming: None,
            root_folder: String::new(),
            environment: environment.into(),
            add_environment_prefix: true,
            backend,
        }
    }

    pub fn with_naming(mut self, naming: impl UploadPath + 'static) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    pub fn with_root_folder(mut self, root_folder: impl Into<String>) -> Self {
        self.root_folder = root_folder.into();
        self
    }

    /// Toggle the `{environment}/` key prefix (on by default).
    pub fn environment_prefix(mut self, enabled: bool) -> Self {
        self.add_environment_prefix = enabled;
        self
    }

    pub fn backend_type(&self) -> BackendKind {
        self.backend.backend_type()
    }

    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    fn environment_segment(&self) -> Option<&str> {
        self.add_environment_prefix
            .then_some(self.environment.as_str())
    }

    fn folder_key(&self, folder: &str) -> String {
        build_storage_key(self.environment_segment(), &self.root_folder, folder)
    }

    /// The key `media` will be stored under.
    ///
    /// Fails with [`StorageError::ConfigError`] when no naming function is set.
    pub fn get_complete_path(
        &self,
        media: &MediaDescriptor,
        params: &NamingParams,
    ) -> StorageResult<String> {
        let naming = self.naming.as_ref().ok_or_else(|| {
            StorageError::ConfigError("no naming function configured for uploads".to_string())
        })?;
        let relative_name = naming.relative_name(media, params);

        Ok(build_storage_key(
            self.environment_segment(),
            &self.root_folder,
            &relative_name,
        ))
    }

    /// Store `media` and return the key it was written to.
    pub async fn upload(
        &self,
        media: MediaDescriptor,
        params: &NamingParams,
    ) -> StorageResult<String> {
        let key = self.get_complete_path(&media, params)?;
        self.backend.upload(&key, media).await?;
        Ok(key)
    }

    pub async fn delete(&self, key: &str) -> StorageResult<DeletedFile> {
        self.backend.delete(key).await
    }

    pub fn location(&self, key: &str) -> String {
        self.backend.location(key)
    }

    /// Entries of `folder`, relative to the root folder and environment.
    pub async fn list_folder(&self, folder: &str) -> StorageResult<Vec<String>> {
        self.backend.list_folder(&self.folder_key(folder)).await
    }

    /// Remove everything in `folder`. See [`StorageBackend::delete_folder`]
    /// for the consistency caveat.
    pub async fn delete_folder(&self, folder: &str) -> StorageResult<Vec<DeletedFile>> {
        let prefix = self.folder_key(folder);
        let deleted = self.backend.delete_folder(&prefix).await?;

        tracing::debug!(
            prefix = %prefix,
            deleted = deleted.len(),
            "Folder delete completed"
        );

        Ok(deleted.into_iter().map(DeletedFile::from).collect())
    }

    pub async fn download(&self, key: &str) -> StorageResult<Download> {
        self.backend.download(key).await
    }

    pub async fn signed_url(&self, key: &str, verify: bool) -> StorageResult<String> {
        self.backend.signed_url(key, verify).await
    }

    /// Wrap this manager in the blocking calling convention.
    pub fn into_blocking(self) -> StorageResult<BlockingMediaManager> {
        BlockingMediaManager::new(self)
    }
}

impl fmt::Debug for MediaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaManager")
            .field("backend", &self.backend.backend_type())
            .field("root_folder", &self.root_folder)
            .field("environment", &self.environment)
            .field("add_environment_prefix", &self.add_environment_prefix)
            .field("has_naming", &self.naming.is_some())
            .finish()
    }
}
