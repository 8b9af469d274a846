//! Logging and optional OpenTelemetry trace export.
//!
//! Console logging through `tracing-subscriber` is always on, filtered by `RUST_LOG` (default
//! `info`). OTLP export over HTTP is off unless `enable_otel_export` is set, and is then configured
//! through the standard environment variables:
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4318`)
//! - `OTEL_EXPORTER_OTLP_PROTOCOL`: `http/protobuf` (default) or `http/json`
//! - `OTEL_EXPORTER_OTLP_HEADERS`: comma-separated `key=value` pairs, `%20` decoded to a space
//! - `OTEL_SERVICE_NAME` (default `svgrender`)
//!
//! If the exporter cannot be built the service still starts, with console logging only.

use std::collections::HashMap;
use std::sync::OnceLock;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_SERVICE_NAME: &str = "svgrender";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

// tracing-opentelemetry holds a tracer, not the provider; keep the provider so spans can be
// flushed at shutdown
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber. Fails only if one is already installed.
pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (tracer, otel_status) = if enable_otel_export {
        match create_otlp_tracer() {
            Ok(tracer) => (Some(tracer), "OTLP export enabled".to_string()),
            Err(e) => (None, format!("OTLP export unavailable: {e:#}")),
        }
    } else {
        (None, "OTLP export disabled".to_string())
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()?;

    info!("Telemetry initialized ({})", otel_status);
    Ok(())
}

fn create_otlp_tracer() -> anyhow::Result<Tracer> {
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());
    let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_otlp_headers(&raw))
        .unwrap_or_default();
    let protocol = match std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
        Ok("http/json") => Protocol::HttpJson,
        _ => Protocol::HttpBinary,
    };

    // the subscriber isn't installed yet
    eprintln!(
        "[OTLP] service={} endpoint={} headers={}",
        service_name,
        endpoint,
        headers.len()
    );

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .with_protocol(protocol)
        .with_headers(headers)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", service_name.clone()))
                .build(),
        )
        .build();

    let tracer = provider.tracer(service_name);
    let _ = TRACER_PROVIDER.set(provider);
    Ok(tracer)
}

/// Parse `OTEL_EXPORTER_OTLP_HEADERS`. Pairs without `=` are skipped.
fn parse_otlp_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Flush pending spans. Call once, after the server has stopped.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}
