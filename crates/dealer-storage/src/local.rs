use crate::traits::{Download, StorageBackend, StorageError, StorageResult};
use crate::BackendKind;
use async_trait::async_trait;
use bytes::Bytes;
use dealer_core::{DeletedFile, MediaDescriptor};
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
///
/// Keys are native paths. Relative keys resolve against the process working
/// directory, or against `base_dir` when one is configured; absolute keys are
/// used as-is.
#[derive(Clone, Debug, Default)]
pub struct LocalStorage {
    base_dir: Option<PathBuf>,
}

impl LocalStorage {
    /// Resolve keys against the current working directory.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Resolve relative keys against `base_dir` instead of the working directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(key),
            None => PathBuf::from(key),
        }
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

fn not_found_or(err: std::io::Error, key: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::IoError(err)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, media: MediaDescriptor) -> StorageResult<()> {
        let path = self.key_to_path(key);
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut reader = media.into_reader();
        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<DeletedFile> {
        let path = self.key_to_path(key);
        let start = std::time::Instant::now();

        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(e, key))?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(DeletedFile {
            key: key.to_string(),
        })
    }

    fn location(&self, key: &str) -> String {
        key.to_string()
    }

    async fn list_folder(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let dir = self.key_to_path(prefix);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| not_found_or(e, prefix))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // A lossy name could not be deleted again, so refuse it outright.
            let name = entry.file_name().into_string().map_err(|raw| {
                StorageError::BackendError(format!(
                    "Entry {:?} in {} is not valid UTF-8",
                    raw,
                    dir.display()
                ))
            })?;
            names.push(name);
        }

        tracing::debug!(
            path = %dir.display(),
            count = names.len(),
            "Local storage list successful"
        );

        Ok(names)
    }

    async fn delete_folder(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let names = self.list_folder(prefix).await?;
        let dir = self.key_to_path(prefix);

        // No batch primitive on a filesystem: one remove per entry.
        for name in &names {
            let path = dir.join(name);
            fs::remove_file(&path).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Local storage folder delete failed"
                );
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        tracing::info!(
            path = %dir.display(),
            deleted = names.len(),
            "Local storage folder delete successful"
        );

        Ok(names)
    }

    async fn download(&self, key: &str) -> StorageResult<Download> {
        let path = self.key_to_path(key);
        let start = std::time::Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(Cursor::new(Bytes::from(data)))
    }

    async fn signed_url(&self, key: &str, _verify: bool) -> StorageResult<String> {
        Err(StorageError::Unsupported(format!(
            "signed URLs are not available for local storage (key: {})",
            key
        )))
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Local
    }
}
