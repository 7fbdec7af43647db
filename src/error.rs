//! Error types for PICA+ decoding.
//!
//! This module provides the [`PicaError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Malformed bytes inside a dump are never errors: they are replaced while
//! decoding continues. Errors are reserved for I/O on sources and sinks and
//! for invalid configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for all PICA+ library operations.
#[derive(Error, Debug)]
pub enum PicaError {
    /// I/O error from the underlying source or destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be opened or read.
    #[error("Source {}: {source}", .path.display())]
    Source {
        /// Path of the failing source.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// An output sink could not be created or written.
    #[error("Sink {}: {source}", .path.display())]
    Sink {
        /// Path of the failing sink.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Error indicating an invalid field tag.
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Error indicating an inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid TOML for [`crate::Config`].
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The statistics report could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`PicaError`].
pub type Result<T> = std::result::Result<T, PicaError>;
