use thiserror::Error;

/// Errors raised while opening or reading a tile archive
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// The locator could not be turned into a storage location
    #[error("Invalid archive locator {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// The archive does not exist at the given location
    #[error("Archive not found: {0}")]
    NotFound(String),

    /// The archive exists but could not be opened as a tiled archive
    #[error("Failed to open archive {locator}: {reason}")]
    Open { locator: String, reason: String },

    /// Reading a tile or directory from an opened archive failed
    #[error("Failed to read from archive: {0}")]
    Read(String),

    /// The archive metadata document is not valid JSON
    #[error("Invalid archive metadata: {0}")]
    InvalidMetadata(String),
}

/// Errors raised while composing links between endpoints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// No endpoint is registered under this name
    #[error("No endpoint named '{0}'")]
    UnknownEndpoint(String),

    /// The mount prefix references a path parameter the request does not carry
    #[error("Mount prefix references path parameter '{0}' which is absent from the request")]
    MissingPrefixParam(String),

    /// A path template has unbalanced braces or an empty placeholder
    #[error("Invalid path template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

impl UrlError {
    /// Whether this error stems from service configuration rather than a bad lookup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            UrlError::MissingPrefixParam(_) | UrlError::InvalidTemplate { .. }
        )
    }
}

/// Request-level errors surfaced by the HTTP handlers
#[derive(Debug, Clone, Error)]
pub enum TilerError {
    /// Archive could not be opened or read
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Link composition failed
    #[error(transparent)]
    Url(#[from] UrlError),

    /// Requested zoom level is outside the supported range
    #[error("Invalid zoom level {zoom}: must be between 0 and {max}")]
    InvalidZoom { zoom: i64, max: u8 },

    /// The archive holds no tile at the requested coordinate
    #[error("Tile {z}/{x}/{y} not found")]
    TileNotFound { z: u8, x: i64, y: i64 },
}

/// Errors raised while validating configuration or assembling the router
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A configuration value is malformed
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// A route or mount prefix template is malformed
    #[error(transparent)]
    Template(#[from] UrlError),
}
