//! Blocking calling convention for [`MediaManager`].
//!
//! Each method drives the async method of the same name to completion on the
//! calling thread. Do not use from inside an async runtime.

use crate::manager::{MediaManager, NamingParams};
use crate::traits::{Download, StorageResult};
use dealer_core::{BlockingRuntime, DeletedFile, MediaDescriptor};

#[derive(Debug)]
pub struct BlockingMediaManager {
    inner: MediaManager,
    runtime: BlockingRuntime,
}

impl BlockingMediaManager {
    pub fn new(inner: MediaManager) -> StorageResult<Self> {
        Ok(Self {
            inner,
            runtime: BlockingRuntime::new()?,
        })
    }

    /// The async manager this wraps.
    pub fn get_ref(&self) -> &MediaManager {
        &self.inner
    }

    pub fn get_complete_path(
        &self,
        media: &MediaDescriptor,
        params: &NamingParams,
    ) -> StorageResult<String> {
        self.inner.get_complete_path(media, params)
    }

    pub fn upload(&self, media: MediaDescriptor, params: &NamingParams) -> StorageResult<String> {
        self.runtime.block_on(self.inner.upload(media, params))
    }

    pub fn delete(&self, key: &str) -> StorageResult<DeletedFile> {
        self.runtime.block_on(self.inner.delete(key))
    }

    pub fn location(&self, key: &str) -> String {
        self.inner.location(key)
    }

    pub fn list_folder(&self, folder: &str) -> StorageResult<Vec<String>> {
        self.runtime.block_on(self.inner.list_folder(folder))
    }

    pub fn delete_folder(&self, folder: &str) -> StorageResult<Vec<DeletedFile>> {
        self.runtime.block_on(self.inner.delete_folder(folder))
    }

    pub fn download(&self, key: &str) -> StorageResult<Download> {
        self.runtime.block_on(self.inner.download(key))
    }

    pub fn signed_url(&self, key: &str, verify: bool) -> StorageResult<String> {
        self.runtime.block_on(self.inner.signed_url(key, verify))
    }
}
