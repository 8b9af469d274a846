//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `SVGRENDER_CONFIG`
//! environment variable. A missing file is not an error, so the service can be configured from the
//! environment alone.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Plain environment variables** - `API_KEY`, `BUCKET_NAME`, `SVG_FETCH_TIMEOUT_SECONDS`,
//!    `MAX_SVG_BYTES`, `MIN_OUTPUT_WIDTH`, `MAX_OUTPUT_WIDTH`, `MAX_OUTPUT_HEIGHT`,
//!    `SIGNED_URL_TTL_SECONDS` and `PRUNE_AFTER_SECONDS`
//! 3. **Prefixed environment variables** - Variables prefixed with `SVGRENDER_`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `SVGRENDER_STORAGE__BACKEND=memory` sets the `storage.backend` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use svgrender::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Required: shared secret expected in the X-API-Key header
//! API_KEY=change-me
//!
//! # Bucket that receives rendered images
//! BUCKET_NAME=svg-render-service
//!
//! # Point at an S3-compatible service
//! SVGRENDER_STORAGE__ENDPOINT_URL=http://localhost:9000
//! SVGRENDER_STORAGE__FORCE_PATH_STYLE=true
//! ```

use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Plain environment variables understood for compatibility with existing deployments, and the
/// config keys they set.
const PLAIN_ENV_KEYS: &[(&str, &str)] = &[
    ("API_KEY", "api_key"),
    ("BUCKET_NAME", "storage.bucket"),
    ("SVG_FETCH_TIMEOUT_SECONDS", "fetch.timeout_secs"),
    ("MAX_SVG_BYTES", "fetch.max_document_bytes"),
    ("MIN_OUTPUT_WIDTH", "output.min_width"),
    ("MAX_OUTPUT_WIDTH", "output.max_width"),
    ("MAX_OUTPUT_HEIGHT", "output.max_height"),
    ("SIGNED_URL_TTL_SECONDS", "storage.signed_url_ttl_secs"),
    ("PRUNE_AFTER_SECONDS", "storage.prune_after_secs"),
];

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SVGRENDER_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Loaded once at startup and never mutated afterwards. All fields have defaults, except that
/// `api_key` must be provided.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Shared secret expected in the `X-API-Key` header of render requests
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Limits for downloading source documents
    pub fetch: FetchConfig,
    /// Output size bounds
    pub output: OutputConfig,
    /// Object store for rendered images
    pub storage: StorageConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Wall-clock limit for the whole download, connect included
    pub timeout_secs: u64,
    /// Largest accepted source document
    pub max_document_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Width small documents are scaled up to, unless a maximum prevents it
    pub min_width: u32,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3 or any S3-compatible service
    #[default]
    S3,
    /// Process-local map, for development only
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Region override; the AWS provider chain is used when unset
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<Url>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub force_path_style: bool,
    /// Static credentials; the AWS provider chain is used when unset
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    /// Lifetime of the signed link returned for each render
    pub signed_url_ttl_secs: u64,
    /// Age after which stored renders are deleted
    pub prune_after_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: None,
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
            storage: StorageConfig::default(),
            enable_metrics: true,
            enable_otel_export: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_document_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_width: 512,
            max_width: 4096,
            max_height: 4096,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: "svg-render-service".to_string(),
            region: None,
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            signed_url_ttl_secs: 3600,
            prune_after_secs: 24 * 3600,
        }
    }
}

impl StorageConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }

    pub fn prune_after(&self) -> Duration {
        Duration::from_secs(self.prune_after_secs)
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        let plain_keys: Vec<&str> = PLAIN_ENV_KEYS.iter().map(|(var, _)| *var).collect();

        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Unprefixed variables, mapped onto their nested keys
            .merge(Env::raw().only(&plain_keys).map(|key| {
                PLAIN_ENV_KEYS
                    .iter()
                    .find(|(var, _)| key == *var)
                    .map(|(_, target)| (*target).into())
                    .unwrap_or_else(|| key.as_str().into())
            }))
            // Prefixed variables win over everything else
            .merge(Env::prefixed("SVGRENDER_").split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Internal {
                operation: "validate config: api_key is not configured. \
                     Please set the API_KEY environment variable or add api_key to the config file."
                    .to_string(),
            });
        }

        if self.fetch.timeout_secs == 0 {
            return Err(Error::Internal {
                operation: "validate config: fetch.timeout_secs must be positive (default: 10).".to_string(),
            });
        }

        if self.fetch.max_document_bytes == 0 {
            return Err(Error::Internal {
                operation: "validate config: fetch.max_document_bytes must be positive (default: 5242880).".to_string(),
            });
        }

        for (name, value) in [
            ("min_width", self.output.min_width),
            ("max_width", self.output.max_width),
            ("max_height", self.output.max_height),
        ] {
            if value == 0 {
                return Err(Error::Internal {
                    operation: format!("validate config: output.{name} must be at least 1"),
                });
            }
        }

        if self.storage.bucket.is_empty() {
            return Err(Error::Internal {
                operation: "validate config: storage.bucket cannot be empty".to_string(),
            });
        }

        // S3 presigned URLs are capped at 7 days
        if self.storage.signed_url_ttl_secs == 0 || self.storage.signed_url_ttl_secs > 7 * 24 * 3600 {
            return Err(Error::Internal {
                operation: format!(
                    "validate config: storage.signed_url_ttl_secs ({}) must be between 1 and 604800",
                    self.storage.signed_url_ttl_secs
                ),
            });
        }

        if self.output.min_width > self.output.max_width {
            tracing::warn!(
                "output.min_width ({}) is larger than output.max_width ({}); max_width takes precedence",
                self.output.min_width,
                self.output.max_width
            );
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        Jail::expect_with(|jail| {
            jail.set_env("API_KEY", "secret");

            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.api_key.as_deref(), Some("secret"));
            assert_eq!(config.bind_address(), "0.0.0.0:8080");
            assert_eq!(config.fetch.timeout_secs, 10);
            assert_eq!(config.fetch.max_document_bytes, 5 * 1024 * 1024);
            assert_eq!(config.output.min_width, 512);
            assert_eq!(config.output.max_width, 4096);
            assert_eq!(config.output.max_height, 4096);
            assert_eq!(config.storage.backend, StorageBackend::S3);
            assert_eq!(config.storage.bucket, "svg-render-service");
            assert_eq!(config.storage.signed_url_ttl(), Duration::from_secs(3600));
            assert_eq!(config.storage.prune_after(), Duration::from_secs(86400));

            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
api_key: from-yaml
port: 9000
fetch:
  timeout_secs: 3
output:
  min_width: 256
storage:
  backend: memory
  bucket: renders-dev
  endpoint_url: http://localhost:9000
  force_path_style: true
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.api_key.as_deref(), Some("from-yaml"));
            assert_eq!(config.port, 9000);
            assert_eq!(config.fetch.timeout_secs, 3);
            // untouched siblings keep their defaults
            assert_eq!(config.fetch.max_document_bytes, 5 * 1024 * 1024);
            assert_eq!(config.output.min_width, 256);
            assert_eq!(config.output.max_width, 4096);
            assert_eq!(config.storage.backend, StorageBackend::Memory);
            assert_eq!(config.storage.bucket, "renders-dev");
            assert_eq!(config.storage.endpoint_url.as_ref().map(Url::as_str), Some("http://localhost:9000/"));
            assert!(config.storage.force_path_style);

            Ok(())
        });
    }

    #[test]
    fn test_plain_env_vars_map_to_nested_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("API_KEY", "secret");
            jail.set_env("BUCKET_NAME", "other-bucket");
            jail.set_env("SVG_FETCH_TIMEOUT_SECONDS", "30");
            jail.set_env("MAX_SVG_BYTES", "1024");
            jail.set_env("MIN_OUTPUT_WIDTH", "100");
            jail.set_env("MAX_OUTPUT_WIDTH", "2000");
            jail.set_env("MAX_OUTPUT_HEIGHT", "1500");
            jail.set_env("SIGNED_URL_TTL_SECONDS", "600");
            jail.set_env("PRUNE_AFTER_SECONDS", "7200");

            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.storage.bucket, "other-bucket");
            assert_eq!(config.fetch.timeout_secs, 30);
            assert_eq!(config.fetch.max_document_bytes, 1024);
            assert_eq!(config.output.min_width, 100);
            assert_eq!(config.output.max_width, 2000);
            assert_eq!(config.output.max_height, 1500);
            assert_eq!(config.storage.signed_url_ttl_secs, 600);
            assert_eq!(config.storage.prune_after_secs, 7200);

            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides_yaml_and_plain_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
api_key: from-yaml
output:
  max_height: 1000
"#,
            )?;
            jail.set_env("MAX_OUTPUT_HEIGHT", "2000");
            jail.set_env("SVGRENDER_OUTPUT__MAX_HEIGHT", "3000");
            jail.set_env("SVGRENDER_HOST", "127.0.0.1");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.output.max_height, 3000);
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.api_key.as_deref(), Some("from-yaml"));

            Ok(())
        });
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        Jail::expect_with(|_jail| {
            let err = Config::load(&args("missing.yaml")).unwrap_err();
            assert!(err.to_string().contains("api_key"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "api_key: x\nmax_svg_size: 10\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let valid = Config {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let mut config = valid.clone();
        config.api_key = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = valid.clone();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid.clone();
        config.fetch.max_document_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = valid.clone();
        config.output.max_height = 0;
        assert!(config.validate().is_err());

        let mut config = valid.clone();
        config.storage.signed_url_ttl_secs = 8 * 24 * 3600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_message_reads_as_sentence() {
        let config = Config::default();
        let message = config.validate().unwrap_err().to_string();
        assert!(
            message.starts_with("Failed to validate config: api_key is not configured."),
            "{message}"
        );

        let config = Config {
            api_key: Some("secret".to_string()),
            storage: StorageConfig {
                bucket: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Failed to validate config: storage.bucket cannot be empty"
        );
    }

    #[test]
    fn test_min_width_above_max_width_is_allowed() {
        let config = Config {
            api_key: Some("secret".to_string()),
            output: OutputConfig {
                min_width: 5000,
                max_width: 4096,
                max_height: 4096,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
