//! # svgrender: SVG to PNG rendering service
//!
//! `svgrender` is a stateless HTTP service. Given the URL of a remote SVG document it downloads the
//! document under strict size and time limits, works out the document's intrinsic size, picks an
//! output size that respects configured width and height bounds, rasterizes the document to PNG,
//! uploads the PNG to an object store and returns a time-limited signed link to it. Every
//! successful render also deletes stored renders older than the retention window.
//!
//! ## Request Flow
//!
//! `POST /render` carries `{"svg_url": "..."}` and an `X-API-Key` header. The [`auth`] extractor
//! rejects the request before the body is read if the key is missing or wrong. The handler
//! validates the URL and hands it to the [`render::Renderer`], which drives the pipeline:
//!
//! - [`fetch`]: bounded download, rejecting oversized, empty or unreachable documents
//! - [`dimensions`]: intrinsic size from `width`/`height` or `viewBox`, then the output size
//! - [`rasterize`]: the rendering engine, run on the blocking thread pool
//! - [`storage`]: upload and signed link, through the [`storage::ObjectStore`] trait
//! - [`prune`]: best-effort retention cleanup, never failing the request
//!
//! Errors from any stage surface as [`errors::Error`]. Faults attributable to the caller's input
//! are reported as 400 with their message; rasterizer and storage faults are 500 with a generic
//! message.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use svgrender::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = svgrender::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     svgrender::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod dimensions;
pub mod errors;
pub mod fetch;
mod openapi;
pub mod prune;
pub mod rasterize;
pub mod render;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::openapi::ApiDoc;
use crate::rasterize::ResvgRasterizer;
use crate::render::Renderer;

/// Largest accepted request body. A render request is a single short URL.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// Everything in here is immutable after startup; cloning is cheap.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub renderer: Arc<Renderer>,
}

/// Build the application router with all routes and layers.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/render", post(api::handlers::render::render_svg))
        .route("/healthz", get(api::handlers::health::healthz))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service: configuration plus a ready router.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create the object store, rasterizer and fetcher from configuration and wire up the router.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = storage::create_store(&config.storage).await?;
        // font discovery walks the filesystem
        let rasterizer = tokio::task::spawn_blocking(ResvgRasterizer::new).await?;
        let renderer = Renderer::new(&config, Arc::new(rasterizer), store)?;

        let state = AppState::builder().config(config.clone()).renderer(Arc::new(renderer)).build();
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "svgrender listening on http://{}, available at http://localhost:{}",
            bind_addr,
            listener.local_addr()?.port()
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
