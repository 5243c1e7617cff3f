//! Uploaded media handle and deletion receipts.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

/// An uploaded file: a readable byte stream plus its display name and
/// optional MIME type.
///
/// The descriptor is consumed by a single upload. Backends read the stream to
/// EOF and drop it before the upload call returns.
pub struct MediaDescriptor {
    filename: String,
    content_type: Option<String>,
    reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
}

impl MediaDescriptor {
    /// Wrap any async reader.
    pub fn new(filename: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            reader: Box::pin(reader),
        }
    }

    /// Build a descriptor over an in-memory buffer.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(filename, Cursor::new(data.into()))
    }

    /// Open a local file. The display name is the path's final component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(filename, file))
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Hand the underlying stream to a backend.
    pub fn into_reader(self) -> Pin<Box<dyn AsyncRead + Send + Unpin>> {
        self.reader
    }

    /// Drain the stream into memory.
    pub async fn read_to_bytes(self) -> std::io::Result<Bytes> {
        let mut reader = self.reader;
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

impl fmt::Debug for MediaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaDescriptor")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Acknowledgement for one object removed by a folder delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletedFile {
    pub key: String,
}

impl From<String> for DeletedFile {
    fn from(key: String) -> Self {
        Self { key }
    }
}
