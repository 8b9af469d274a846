//! The render pipeline.
//!
//! ```text
//! Renderer::render(url)
//!   ├─ BoundedFetcher::fetch()          // client error on any failure
//!   ├─ dimensions::intrinsic_size_of()  // client error if not XML
//!   ├─ dimensions::resolve_target_size()
//!   ├─ Rasterizer::rasterize()          // blocking pool, system fault on failure
//!   ├─ ObjectStore::put() + signed_url() // system fault on failure
//!   └─ Pruner::prune()                  // never fails the request
//! ```
//!
//! Nothing is retried. Once the upload is signed the request has succeeded, whatever pruning does.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::Config;
use crate::dimensions::{self, Bounds, TargetSize};
use crate::errors::{Error, Result};
use crate::fetch::BoundedFetcher;
use crate::prune::Pruner;
use crate::rasterize::Rasterizer;
use crate::storage::{self, ObjectStore};

/// Everything a successful render reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub png_url: String,
    pub object_name: String,
    pub dimensions: TargetSize,
    pub pruned_files: u64,
}

#[derive(Clone)]
pub struct Renderer {
    fetcher: BoundedFetcher,
    rasterizer: Arc<dyn Rasterizer>,
    store: Arc<dyn ObjectStore>,
    pruner: Pruner,
    bounds: Bounds,
    signed_url_ttl: Duration,
}

impl Renderer {
    pub fn new(config: &Config, rasterizer: Arc<dyn Rasterizer>, store: Arc<dyn ObjectStore>) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: BoundedFetcher::new(&config.fetch)?,
            rasterizer,
            pruner: Pruner::new(store.clone(), config.storage.prune_after()),
            store,
            bounds: Bounds::from(&config.output),
            signed_url_ttl: config.storage.signed_url_ttl(),
        })
    }

    #[instrument(skip_all, fields(svg_url = %url))]
    pub async fn render(&self, url: &Url) -> Result<RenderOutcome> {
        let result = self.render_and_upload(url).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_client_error() => "client_error",
            Err(_) => "failure",
        };
        metrics::counter!("svgrender_renders_total", "outcome" => outcome).increment(1);
        let (object_name, png_url, dimensions) = result?;

        let pruned_files = self.pruner.prune(Utc::now()).await;

        Ok(RenderOutcome {
            png_url,
            object_name,
            dimensions,
            pruned_files,
        })
    }

    async fn render_and_upload(&self, url: &Url) -> Result<(String, String, TargetSize)> {
        let document = self.fetcher.fetch(url).await?;

        let intrinsic = dimensions::intrinsic_size_of(&document)?;
        let target = dimensions::resolve_target_size(intrinsic, self.bounds);
        debug!(?intrinsic, ?target, "Resolved output size");

        let png = self.rasterize(document, target).await?;

        let object_name = storage::new_object_key();
        self.store
            .put(&object_name, Bytes::from(png), "image/png")
            .await
            .map_err(Error::Storage)?;
        let png_url = self
            .store
            .signed_url(&object_name, self.signed_url_ttl)
            .await
            .map_err(Error::Storage)?;

        info!(object_name = %object_name, width = target.width, height = target.height, "Rendered SVG");
        Ok((object_name, png_url, target))
    }

    async fn rasterize(&self, document: Bytes, target: TargetSize) -> Result<Vec<u8>> {
        let rasterizer = self.rasterizer.clone();
        let png = tokio::task::spawn_blocking(move || rasterizer.rasterize(&document, target.width, target.height))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join rasterizer task: {e}"),
            })??;
        Ok(png)
    }
}
