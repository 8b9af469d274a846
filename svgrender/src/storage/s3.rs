//! S3-compatible object store.
//!
//! Credentials and region come from the standard AWS provider chain unless overridden in
//! configuration. `endpoint_url` + `force_path_style` allow MinIO, R2 and similar services.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{ObjectStore, StoredObject};
use crate::config::StorageConfig;

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                loader = loader.credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "svgrender-config",
                ));
            }
            (None, None) => {}
            _ => return Err(anyhow!("storage.access_key_id and storage.secret_access_key must be set together")),
        }

        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint_url {
            s3_config = s3_config.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }

        debug!(bucket = %config.bucket, endpoint = ?config.endpoint_url, "Configured S3 object store");

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket: config.bucket.clone(),
        })
    }
}

fn to_chrono(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| anyhow!("put {key}: {}", DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        let presigning = PresigningConfig::expires_in(ttl).context("invalid signed URL lifetime")?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| anyhow!("presign {key}: {}", DisplayErrorContext(&e)))?;
        Ok(request.uri().to_string())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StoredObject>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| anyhow!("list {prefix}: {}", DisplayErrorContext(&e)))?;
            for object in page.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                objects.push(StoredObject {
                    key: key.to_string(),
                    created_at: object.last_modified().and_then(to_chrono),
                });
            }
        }

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("delete {key}: {}", DisplayErrorContext(&e)))?;
        Ok(())
    }
}
