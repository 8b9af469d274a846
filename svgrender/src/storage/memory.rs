//! In-process object store.
//!
//! Keeps objects in a map for the lifetime of the process. Useful for local development without a
//! bucket, and as the store in tests. Signed URLs are not fetchable; they only carry the key and
//! expiry in a recognisable form.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{ObjectStore, StoredObject};

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub bytes: Bytes,
    pub content_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert an object with an explicit creation time, bypassing [`ObjectStore::put`].
    pub fn insert(&self, key: &str, bytes: Bytes, content_type: &str, created_at: Option<DateTime<Utc>>) {
        self.lock().insert(
            key.to_string(),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
                created_at,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemoryObject>> {
        // a panic while holding the lock can't leave the map half-updated
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.insert(key, bytes, content_type, Some(Utc::now()));
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        if !self.lock().contains_key(key) {
            anyhow::bail!("no object {key} in bucket {}", self.bucket);
        }
        let expires = Utc::now() + chrono::TimeDelta::from_std(ttl)?;
        Ok(format!("memory://{}/{}?expires={}", self.bucket, key, expires.timestamp()))
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StoredObject>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StoredObject {
                key: key.clone(),
                created_at: object.created_at,
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
