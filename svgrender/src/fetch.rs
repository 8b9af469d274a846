//! Bounded download of untrusted source documents.
//!
//! The remote server is not trusted to be honest about its response size, so the byte ceiling is
//! enforced twice: once against `Content-Length` before any body is read, and again against the
//! bytes actually received while streaming.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::FetchConfig;

/// Every variant is the caller's problem: a bad URL, a bad server or a bad document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unable to download SVG: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unable to download SVG: upstream responded with {0}")]
    Status(StatusCode),

    #[error("SVG exceeds maximum allowed size.")]
    TooLarge { limit: u64 },

    #[error("SVG document is empty.")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct BoundedFetcher {
    client: Client,
    max_bytes: u64,
}

impl BoundedFetcher {
    const USER_AGENT: &'static str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        // reqwest is built without a bundled provider; the first install wins
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_document_bytes,
        })
    }

    /// Download `url` into memory, failing once the body exceeds the configured ceiling.
    #[instrument(skip_all, fields(url = %url), err)]
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if let Some(declared) = response.content_length()
            && declared > self.max_bytes
        {
            debug!(declared, limit = self.max_bytes, "Rejecting document by declared length");
            return Err(FetchError::TooLarge { limit: self.max_bytes });
        }

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (buffer.len() + chunk.len()) as u64 > self.max_bytes {
                debug!(received = buffer.len() + chunk.len(), limit = self.max_bytes, "Aborting oversized download");
                return Err(FetchError::TooLarge { limit: self.max_bytes });
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.trim_ascii().is_empty() {
            return Err(FetchError::Empty);
        }

        debug!(bytes = buffer.len(), "Fetched source document");
        Ok(buffer.freeze())
    }
}
