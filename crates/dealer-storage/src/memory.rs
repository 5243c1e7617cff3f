//! In-memory [`ObjectClient`] that records every request it receives.

use crate::client::ObjectClient;
use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

/// One request made against an [`InMemoryObjectClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCall {
    Put(String),
    Get(String),
    Head(String),
    List(String),
    DeleteBatch(Vec<String>),
    Presign(String),
}

/// A flat key/value bucket held in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectClient {
    objects: Mutex<BTreeMap<String, Bytes>>,
    calls: Mutex<Vec<ObjectCall>>,
}

impl InMemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call (e.g. a `folder/` marker).
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.objects.lock().insert(key.into(), body.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }

    /// Requests seen so far, oldest first.
    pub fn calls(&self) -> Vec<ObjectCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: ObjectCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ObjectClient for InMemoryObjectClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: Option<&str>,
    ) -> StorageResult<()> {
        self.record(ObjectCall::Put(key.to_string()));
        self.objects.lock().insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.record(ObjectCall::Get(key.to_string()));
        self.objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head_object(&self, key: &str) -> StorageResult<()> {
        self.record(ObjectCall::Head(key.to_string()));
        if self.contains(key) {
            Ok(())
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.record(ObjectCall::List(prefix.to_string()));
        // Same key form as ObjectStoreClient: delimiters trimmed at both ends.
        Ok(self
            .objects
            .lock()
            .keys()
            .map(|key| key.trim_matches('/'))
            .filter(|key| key.starts_with(prefix))
            .map(str::to_owned)
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<()> {
        self.record(ObjectCall::DeleteBatch(keys.to_vec()));
        let mut objects = self.objects.lock();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.record(ObjectCall::Presign(key.to_string()));
        Ok(format!(
            "memory://{}?X-Amz-Expires={}&X-Amz-Signature=unsigned",
            key,
            expires_in.as_secs()
        ))
    }
}
