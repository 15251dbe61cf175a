//! Error types for sigil_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using sigil_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during manifest operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Manifest file is not a JSON object of string to string.
    #[error("Invalid manifest at {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// Manifest file disappeared underneath a live instance.
    #[error("Manifest not found: {path}")]
    ManifestMissing { path: PathBuf },

    /// More than one manifest file was found in the base directory.
    #[error(
        "Found {} manifest files in {}: {}",
        .candidates.len(),
        .dir.display(),
        .candidates.join(", ")
    )]
    MultipleManifests { dir: PathBuf, candidates: Vec<String> },

    /// An asset path cannot be represented in the manifest.
    #[error("Invalid asset path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },
}

impl Error {
    /// Create a ManifestParse error.
    pub fn manifest_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::ManifestParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a ManifestMissing error.
    pub fn manifest_missing(path: impl Into<PathBuf>) -> Self {
        Error::ManifestMissing { path: path.into() }
    }

    /// Create a MultipleManifests error.
    pub fn multiple_manifests(dir: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        Error::MultipleManifests {
            dir: dir.into(),
            candidates,
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
