// src/error.rs

use thiserror::Error;

/// Core error types for disposal
///
/// Only setup failures are represented here. Override lookups that miss,
/// residual brokenness after resolution and empty diffs are diagnostics,
/// not errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Package cache database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Package cache initialization error
    #[error("Failed to initialize package cache: {0}")]
    InitError(String),

    /// Package cache not found
    #[error("Package cache not found at path: {0}")]
    DatabaseNotFound(String),

    /// Malformed index stanza, version or relation
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration file or option
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Candidate policy could not be built
    #[error("Policy error: {0}")]
    PolicyError(String),

    /// Package index files could not be located or read
    #[error("Index error: {0}")]
    IndexError(String),
}

/// Result type alias using disposal's Error type
pub type Result<T> = std::result::Result<T, Error>;
