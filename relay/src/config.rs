//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CLAUSEGUARD_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CLAUSEGUARD_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CLAUSEGUARD_UPSTREAM__URL=http://analysis:8000/analyze` sets the `upstream.url` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Uploads**: `upload_dir`, `max_upload_bytes` - spool directory and request body cap
//! - **Upstream**: `upstream.url`, `upstream.timeout`, `upstream.max_retries`,
//!   `upstream.backoff`, `upstream.backoff_factor`, `upstream.max_backoff` - the analysis
//!   endpoint the relay forwards uploads to, with per-attempt timeout and transient-failure
//!   retry policy
//!
//! Durations use humantime syntax (`30s`, `500ms`).

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CLAUSEGUARD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Loaded from YAML and environment variables; every field has a default so the
/// relay starts with no config file at all.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory that holds in-flight uploads; created on startup if absent
    pub upload_dir: PathBuf,
    /// Request body cap for `POST /analyze`, in bytes
    pub max_upload_bytes: usize,
    /// Upstream analysis service settings
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 25 * 1024 * 1024,
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Settings for the upstream analysis endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Analysis endpoint the relay forwards uploads to
    pub url: Url,
    /// Per-attempt timeout for the upstream call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Extra attempts after a transient failure (0 = single attempt).
    /// Only timeouts and connection errors are retried; upstream rejections are permanent.
    pub max_retries: u32,
    /// Base backoff between retries (exponentially increased)
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
    /// Factor by which the backoff is increased with each retry
    pub backoff_factor: u32,
    /// Maximum backoff between retries
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:8000/analyze").expect("default upstream URL is valid"),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            backoff: Duration::from_millis(500),
            backoff_factor: 2,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        match self.upstream.url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: unsupported upstream URL scheme '{scheme}' (expected http or https)"
                    ),
                });
            }
        }

        if self.upstream.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: upstream.timeout must be greater than zero".to_string(),
            });
        }

        if self.upstream.backoff_factor == 0 {
            return Err(Error::Internal {
                operation: "Config validation: upstream.backoff_factor must be at least 1".to_string(),
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(Error::Internal {
                operation: "Config validation: max_upload_bytes must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values. CLAUSEGUARD_CONFIG
            // belongs to the CLI args, not to this struct.
            .merge(Env::prefixed("CLAUSEGUARD_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
