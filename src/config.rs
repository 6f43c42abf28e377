//! Configuration management for the tiler.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `PMTILES_TILER_` prefix
//! - Defaults for all settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pmtiles_tiler::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `PMTILES_TILER_HOST` - Server bind address (default: 0.0.0.0)
//! - `PMTILES_TILER_PORT` - Server port (default: 8080)
//! - `PMTILES_TILER_NAME` - Service name (default: pmtiles-tiler)
//! - `PMTILES_TILER_CORS_ORIGINS` - Allowed origins, comma separated (default: *)
//! - `PMTILES_TILER_CACHE_CONTROL` - Cache-Control header value (default: public, max-age=3600)
//! - `PMTILES_TILER_ROOT_PATH` - Path a reverse proxy serves the tiler under
//! - `PMTILES_TILER_MOUNT_PREFIX` - Path the tiler routes are nested under, e.g. /collections/{id}
//! - `PMTILES_TILER_STORE_OPTIONS` - Object store options, comma separated key=value pairs

use clap::Parser;

use crate::error::ConfigError;
use crate::server::PathTemplate;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default service name.
pub const DEFAULT_NAME: &str = "pmtiles-tiler";

/// Default allowed CORS origins (any).
pub const DEFAULT_CORS_ORIGINS: &str = "*";

/// Default Cache-Control header value (1 hour).
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=3600";

// =============================================================================
// CLI Arguments
// =============================================================================

/// pmtiles-tiler - Serve tiles, TileJSON and MapLibre styles from PMTiles archives.
///
/// Archives are named per request with the `url` query parameter and may
/// live on the local filesystem or in object storage (s3://, gs://, az://, https://).
#[derive(Parser, Debug, Clone)]
#[command(name = "pmtiles-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PMTILES_TILER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PMTILES_TILER_PORT")]
    pub port: u16,

    /// Service name reported at startup.
    #[arg(long, default_value = DEFAULT_NAME, env = "PMTILES_TILER_NAME")]
    pub name: String,

    // =========================================================================
    // Routing Configuration
    // =========================================================================
    /// Path a reverse proxy exposes the service under (e.g. /api).
    ///
    /// Prepended to every generated link.
    #[arg(long, default_value = "", env = "PMTILES_TILER_ROOT_PATH")]
    pub root_path: String,

    /// Path the tiler endpoints are nested under.
    ///
    /// May contain `{param}` placeholders, bound from the request path when
    /// links are generated.
    #[arg(long, default_value = "", env = "PMTILES_TILER_MOUNT_PREFIX")]
    pub mount_prefix: String,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated, `*` allows any origin).
    #[arg(
        long,
        default_value = DEFAULT_CORS_ORIGINS,
        env = "PMTILES_TILER_CORS_ORIGINS",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    /// Cache-Control header applied to tiler responses.
    #[arg(long, default_value = DEFAULT_CACHE_CONTROL, env = "PMTILES_TILER_CACHE_CONTROL")]
    pub cache_control: String,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Object store option as key=value (repeatable), e.g. aws_region=eu-west-1.
    #[arg(
        long = "store-option",
        env = "PMTILES_TILER_STORE_OPTIONS",
        value_delimiter = ','
    )]
    pub store_options: Vec<String>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root_path.is_empty() && !self.root_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "root_path",
                reason: format!("'{}' must start with '/'", self.root_path),
            });
        }

        if !self.mount_prefix.is_empty() {
            if !self.mount_prefix.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "mount_prefix",
                    reason: format!("'{}' must start with '/'", self.mount_prefix),
                });
            }
            PathTemplate::parse(&self.mount_prefix)?;
        }

        if self.cache_control.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache_control",
                reason: "must not be empty".to_string(),
            });
        }

        self.parse_store_options()?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins, `None` when any origin is allowed.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        if self.cors_origins.iter().any(|o| o.trim() == "*") {
            return None;
        }
        Some(
            self.cors_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        )
    }

    /// Mount prefix, `None` when the tiler is served at the root.
    pub fn mount_prefix(&self) -> Option<&str> {
        Some(self.mount_prefix.as_str()).filter(|p| !p.is_empty() && *p != "/")
    }

    /// Split the `key=value` store options.
    pub fn parse_store_options(&self) -> Result<Vec<(String, String)>, ConfigError> {
        self.store_options
            .iter()
            .map(|option| match option.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(ConfigError::InvalidValue {
                    field: "store_options",
                    reason: format!("'{}' is not a key=value pair", option),
                }),
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
