use clap::Parser;
use svgrender::{Application, Config, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, draining in-flight renders..."),
        _ = terminate => tracing::info!("Received SIGTERM, draining in-flight renders..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Both the source fetcher and the S3 client build TLS clients without a bundled provider
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = svgrender::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!(?args, storage = ?config.storage.backend, "Starting svgrender");

    Application::new(config).await?.serve(shutdown_signal()).await
}
