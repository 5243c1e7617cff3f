use crate::client::{ObjectClient, ObjectStoreClient};
use crate::traits::{Download, StorageBackend, StorageError, StorageResult};
use crate::BackendKind;
use async_trait::async_trait;
use dealer_core::{DeletedFile, MediaDescriptor, S3Overrides, S3Settings};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of URLs returned by [`S3Storage::signed_url`].
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// S3 storage implementation
///
/// Keys live in one flat bucket namespace; folders are a prefix convention.
#[derive(Clone)]
pub struct S3Storage {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage from resolved settings.
    ///
    /// Builds the `object_store` client without contacting the bucket.
    pub fn new(settings: &S3Settings) -> StorageResult<Self> {
        let client = ObjectStoreClient::new(settings)?;
        Ok(Self {
            client: Arc::new(client),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            endpoint_url: settings.endpoint.clone(),
        })
    }

    /// Resolve bucket, credentials and region from `explicit` with the
    /// environment as fallback, failing before any I/O if one is missing.
    pub fn from_env(explicit: S3Overrides) -> StorageResult<Self> {
        let settings = S3Settings::from_env(explicit)?;
        Self::new(&settings)
    }

    /// Use a caller-supplied transport, e.g. an in-memory bucket.
    pub fn with_client(
        client: Arc<dyn ObjectClient>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
            endpoint_url: None,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses the endpoint URL if provided
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            // Path-style: {endpoint}/{bucket}/{key}
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn upload(&self, key: &str, media: MediaDescriptor) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let content_type = media.content_type().map(str::to_owned);

        let body = media.read_to_bytes().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
        })?;
        let size = body.len() as u64;

        self.client
            .put_object(key, body, content_type.as_deref())
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                e
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeletedFile> {
        let start = std::time::Instant::now();

        // S3 deletes are idempotent; check first so a missing key is reported.
        self.client.head_object(key).await?;
        self.client.delete_objects(&[key.to_string()]).await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(DeletedFile {
            key: key.to_string(),
        })
    }

    fn location(&self, key: &str) -> String {
        self.generate_url(key)
    }

    async fn list_folder(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // Listed keys lose their trailing `/`, so the marker is the bare folder.
        let marker = prefix.trim_end_matches('/');
        let keys = self.client.list_objects(prefix).await?;

        Ok(keys.into_iter().filter(|key| key != marker).collect())
    }

    async fn delete_folder(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let keys = self.list_folder(prefix).await?;
        if keys.is_empty() {
            return Ok(keys);
        }

        let start = std::time::Instant::now();
        self.client.delete_objects(&keys).await?;

        tracing::info!(
            bucket = %self.bucket,
            prefix = %prefix,
            deleted = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 folder delete successful"
        );

        Ok(keys)
    }

    async fn download(&self, key: &str) -> StorageResult<Download> {
        let start = std::time::Instant::now();

        let bytes = self.client.get_object(key).await.map_err(|e| {
            if !e.is_not_found() {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
            }
            e
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(Cursor::new(bytes))
    }

    async fn signed_url(&self, key: &str, verify: bool) -> StorageResult<String> {
        if verify {
            self.client.head_object(key).await?;
        }
        self.client.presign_get(key, SIGNED_URL_EXPIRY).await
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::S3
    }
}

#[cfg(all(test, feature = "storage-s3"))]
mod tests {
    use super::*;
    use crate::memory::{InMemoryObjectClient, ObjectCall};

    fn storage() -> (Arc<InMemoryObjectClient>, S3Storage) {
        let client = Arc::new(InMemoryObjectClient::new());
        let storage = S3Storage::with_client(client.clone(), "media-bucket", "us-east-2");
        (client, storage)
    }

    #[test]
    fn test_location_uses_virtual_hosted_url() {
        let (_, storage) = storage();
        assert_eq!(
            storage.location("local/docs/a.txt"),
            "https://media-bucket.s3.us-east-2.amazonaws.com/local/docs/a.txt"
        );
    }

    #[test]
    fn test_location_uses_custom_endpoint() {
        let settings = S3Settings {
            bucket: "media".to_string(),
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9000/".to_string()),
        };
        let storage = S3Storage::new(&settings).unwrap();
        assert_eq!(storage.location("a/b.png"), "http://localhost:9000/media/a/b.png");
    }

    #[tokio::test]
    async fn test_list_excludes_folder_marker() {
        let (client, storage) = storage();
        client.insert("test_files/downloads/", bytes::Bytes::new());
        client.insert("test_files/downloads/a.txt", "a");
        client.insert("test_files/downloads/b.txt", "b");

        let keys = storage.list_folder("test_files/downloads").await.unwrap();
        assert_eq!(
            keys,
            vec!["test_files/downloads/a.txt", "test_files/downloads/b.txt"]
        );
    }

    #[tokio::test]
    async fn test_list_matches_leading_characters_and_keeps_marker() {
        let (client, storage) = storage();
        client.insert("reports/", bytes::Bytes::new());
        client.insert("reports/2024-q1.pdf", "1");
        client.insert("reports/2024-q2.pdf", "2");
        client.insert("reports/2023.pdf", "3");

        let keys = storage.list_folder("reports/2024").await.unwrap();
        assert_eq!(keys, vec!["reports/2024-q1.pdf", "reports/2024-q2.pdf"]);

        let deleted = storage.delete_folder("reports").await.unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(client.contains("reports/"));
    }

    #[tokio::test]
    async fn test_delete_empty_folder_makes_no_delete_request() {
        let (client, storage) = storage();
        client.insert("empty/", bytes::Bytes::new());

        let deleted = storage.delete_folder("empty").await.unwrap();

        assert!(deleted.is_empty());
        assert_eq!(client.calls(), vec![ObjectCall::List("empty".to_string())]);
    }

    #[tokio::test]
    async fn test_delete_folder_issues_single_batch() {
        let (client, storage) = storage();
        client.insert("batch/one.pdf", "1");
        client.insert("batch/two.xml", "2");

        let deleted = storage.delete_folder("batch").await.unwrap();

        let expected = vec!["batch/one.pdf".to_string(), "batch/two.xml".to_string()];
        assert_eq!(deleted, expected);
        assert_eq!(
            client.calls(),
            vec![
                ObjectCall::List("batch".to_string()),
                ObjectCall::DeleteBatch(expected),
            ]
        );
        assert!(storage.list_folder("batch").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_not_found() {
        let (client, storage) = storage();

        let result = storage.delete("never/uploaded.txt").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(
            client.calls(),
            vec![ObjectCall::Head("never/uploaded.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let (_, storage) = storage();
        let media = MediaDescriptor::from_bytes("hello.txt", &b"Hello World!"[..])
            .with_content_type("text/plain");

        storage.upload("docs/hello.txt", media).await.unwrap();
        let downloaded = storage.download("docs/hello.txt").await.unwrap();

        assert_eq!(downloaded.position(), 0);
        assert_eq!(&downloaded.into_inner()[..], b"Hello World!");
    }

    #[tokio::test]
    async fn test_verified_signed_url_requires_object() {
        let (client, storage) = storage();

        let result = storage.signed_url("missing.txt", true).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!client.calls().contains(&ObjectCall::Presign("missing.txt".to_string())));
    }

    #[tokio::test]
    async fn test_unverified_signed_url_skips_head() {
        let (client, storage) = storage();

        let url = storage.signed_url("missing.txt", false).await.unwrap();

        assert!(url.contains("X-Amz-Expires=3600"));
        assert_eq!(
            client.calls(),
            vec![ObjectCall::Presign("missing.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_verified_signed_url_for_existing_object() {
        let (client, storage) = storage();
        client.insert("present.txt", "x");

        storage.signed_url("present.txt", true).await.unwrap();

        assert_eq!(
            client.calls(),
            vec![
                ObjectCall::Head("present.txt".to_string()),
                ObjectCall::Presign("present.txt".to_string()),
            ]
        );
    }
}
