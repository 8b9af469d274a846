//! Test utilities: fakes for the pipeline's seams and a ready-made test server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::{Config, StorageBackend};
use crate::rasterize::{RasterizeError, Rasterizer};
use crate::render::Renderer;
use crate::storage::memory::MemoryStore;
use crate::storage::{ObjectStore, StoredObject};
use crate::{AppState, build_router};

pub const TEST_API_KEY: &str = "test-api-key";

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_key: Some(TEST_API_KEY.to_string()),
        enable_metrics: false,
        ..Default::default()
    };
    config.storage.backend = StorageBackend::Memory;
    config.storage.bucket = "test-bucket".to_string();
    config.fetch.timeout_secs = 2;
    config
}

/// Rasterizer that records the requested sizes and returns a fixed payload.
#[derive(Default)]
pub struct RecordingRasterizer {
    fail: bool,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl RecordingRasterizer {
    pub const PNG: &'static [u8] = b"\x89PNG\r\n\x1a\nfake";

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Rasterizer for RecordingRasterizer {
    fn rasterize(&self, _document: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RasterizeError> {
        self.calls.lock().unwrap().push((width, height));
        if self.fail {
            return Err(RasterizeError::Parse("unsupported element".to_string()));
        }
        Ok(Self::PNG.to_vec())
    }
}

/// Object store that fails one kind of operation and otherwise behaves like [`MemoryStore`].
pub struct FailingStore {
    inner: MemoryStore,
    fail_put: bool,
    fail_list: bool,
    fail_delete: bool,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new("failing-bucket"),
            fail_put: false,
            fail_list: false,
            fail_delete: false,
        }
    }

    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::new()
        }
    }

    pub fn failing_list() -> Self {
        Self {
            fail_list: true,
            ..Self::new()
        }
    }

    /// A store seeded with `objects` whose deletes always fail.
    pub fn failing_delete(objects: Vec<(&str, Option<DateTime<Utc>>)>) -> Self {
        let store = Self {
            fail_delete: true,
            ..Self::new()
        };
        for (key, created_at) in objects {
            store.inner.insert(key, Bytes::from_static(b"png"), "image/png", created_at);
        }
        store
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()> {
        if self.fail_put {
            return Err(anyhow!("put {key}: connection reset"));
        }
        self.inner.put(key, bytes, content_type).await
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        self.inner.signed_url(key, ttl).await
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StoredObject>> {
        if self.fail_list {
            return Err(anyhow!("list {prefix}: access denied"));
        }
        self.inner.list(prefix).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_delete {
            return Err(anyhow!("delete {key}: access denied"));
        }
        self.inner.delete(key).await
    }
}

/// Build a test server around the real router, with the given rasterizer and store behind it.
pub fn create_test_server(config: Config, rasterizer: Arc<dyn Rasterizer>, store: Arc<dyn ObjectStore>) -> TestServer {
    let renderer = Renderer::new(&config, rasterizer, store).expect("Failed to build renderer");
    let state = AppState::builder().config(config).renderer(Arc::new(renderer)).build();
    let router = build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}
