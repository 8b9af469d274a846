//! Object store abstraction for rendered images.
//!
//! The render pipeline only needs four operations from a store: upload with a content type,
//! mint a time-limited signed link, list by key prefix with creation times, and delete by key.
//! [`ObjectStore`] captures exactly that, so the pipeline and the pruning policy can be exercised
//! without a real bucket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::{StorageBackend, StorageConfig};

pub mod memory;
pub mod s3;

/// Key prefix under which every rendered image is stored, and the only prefix that is pruned.
pub const OBJECT_PREFIX: &str = "renders";

/// One entry of a prefix listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    /// `None` when the store did not report a timestamp; such objects are never pruned.
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()>;

    /// A URL granting read access to `key` for `ttl` without further credentials.
    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String>;

    /// Every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StoredObject>>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Create the configured object store.
///
/// This is the single point where storage configuration turns into a store instance.
pub async fn create_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::S3 => Ok(Arc::new(s3::S3Store::from_config(config).await?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store; rendered images will not survive a restart");
            Ok(Arc::new(memory::MemoryStore::new(config.bucket.clone())))
        }
    }
}

/// Key for a new rendered image: `renders/<random hex>.png`.
pub fn new_object_key() -> String {
    format!("{OBJECT_PREFIX}/{}.png", uuid::Uuid::new_v4().simple())
}
