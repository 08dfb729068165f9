//! Error types for the producer-side API.
//!
//! The render path never returns errors; everything here is reported from
//! pack loading and the frontend pipeline. Messages are written to be
//! surfaced verbatim through `get_last_error` on the FFI boundary.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("language pack not found at {0}")]
    PackNotFound(PathBuf),

    #[error("failed to parse pack file {path}: {message}")]
    PackParse { path: PathBuf, message: String },

    #[error("unknown language tag: {0}")]
    UnknownLanguage(String),

    #[error("{pass} pass failed: {reason}")]
    PassFailure { pass: &'static str, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
