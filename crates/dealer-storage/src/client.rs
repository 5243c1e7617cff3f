//! Object-store transport capability.
//!
//! [`S3Storage`](crate::S3Storage) talks to the bucket only through
//! [`ObjectClient`]. [`ObjectStoreClient`] is the production implementation on
//! top of the `object_store` crate; [`InMemoryObjectClient`](crate::memory::InMemoryObjectClient)
//! backs tests and local development.

use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use dealer_core::S3Settings;
use futures::{StreamExt, TryStreamExt};
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// Key-based object operations against a single bucket.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    /// Existence check; a missing key yields [`StorageError::NotFound`].
    async fn head_object(&self, key: &str) -> StorageResult<()>;

    /// Every key whose leading characters are `prefix`.
    ///
    /// Keys come back in `object_store` form: without a leading or trailing
    /// `/`, so a `folder/` marker is listed as `folder`.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove all `keys` in one batch request.
    async fn delete_objects(&self, keys: &[String]) -> StorageResult<()>;

    /// Presigned GET URL valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
}

/// Parse `key` verbatim. Unlike `Path::from` this never percent-encodes, so
/// the stored key is the one the caller built.
fn object_path(key: &str) -> StorageResult<Path> {
    Path::parse(key)
        .map_err(|e| StorageError::BackendError(format!("Invalid object key {}: {}", key, e)))
}

/// Deepest `/`-delimited directory of `prefix`, e.g. `a/b` for `a/b/c`.
fn parent_dir(prefix: &str) -> StorageResult<Option<Path>> {
    match prefix.rfind('/') {
        Some(idx) if idx > 0 => object_path(&prefix[..idx]).map(Some),
        _ => Ok(None),
    }
}

fn map_not_found(key: &str, err: ObjectStoreError) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        other => StorageError::BackendError(other.to_string()),
    }
}

/// [`ObjectClient`] over an `object_store` Amazon S3 store.
#[derive(Clone, Debug)]
pub struct ObjectStoreClient {
    store: AmazonS3,
    bucket: String,
}

impl ObjectStoreClient {
    /// Build the store from explicit credentials. No request is made here.
    pub fn new(settings: &S3Settings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(settings.bucket.clone())
            .with_region(settings.region.clone())
            .with_access_key_id(settings.access_key_id.clone())
            .with_secret_access_key(settings.secret_access_key.clone());

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            store,
            bucket: settings.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let location = object_path(key)?;
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(body), opts)
            .await;

        result
            .map(|_| ())
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", key, e)))
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let location = object_path(key)?;

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_not_found(key, e))?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("{}: {}", key, e)))
    }

    async fn head_object(&self, key: &str) -> StorageResult<()> {
        let location = object_path(key)?;
        self.store
            .head(&location)
            .await
            .map(|_| ())
            .map_err(|e| map_not_found(key, e))
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // object_store lists whole path segments; narrow to the raw prefix here.
        let parent = parent_dir(prefix)?;
        let keys = self
            .store
            .list(parent.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<String>>()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(keys
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<()> {
        let locations: Vec<ObjectResult<Path>> = keys
            .iter()
            .map(|key| object_path(key))
            .collect::<StorageResult<Vec<_>>>()?
            .into_iter()
            .map(Ok)
            .collect();

        let mut results = self
            .store
            .delete_stream(futures::stream::iter(locations).boxed());

        while let Some(result) = results.next().await {
            result.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    "S3 batch delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;
        }

        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = object_path(key)?;
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }
}
