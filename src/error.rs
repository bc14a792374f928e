//! Error handling for the mule library.
//!
//! This module provides centralized error handling for everything that can
//! go wrong during a download run: transport failures, local I/O failures,
//! validation mismatches, and archive extraction problems. All errors
//! implement the standard Error trait via `thiserror`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can happen when using mule.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Local filesystem failure while reading, writing, or deleting files.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library (DNS, connect, TLS, mid-stream reset).
    #[error("Reqwest error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the reqwest middleware stack.
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// The server answered a request with a non-success status.
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// The temp file is not an archive this crate can unpack.
    #[error("Unsupported archive format: {0:?}")]
    UnsupportedArchive(PathBuf),

    /// An archive entry would be restored outside the target directory.
    #[error("Unsafe archive entry: {0}")]
    UnsafeArchiveEntry(String),

    /// The run was aborted through its cancellation token.
    #[error("Cancelled")]
    Cancelled,
}

/// Result type alias for operations that can fail with a mule error.
pub type Result<T> = std::result::Result<T, Error>;
