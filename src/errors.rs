//! Error taxonomy shared by the store, fetcher, analyzer, and pipeline.
//!
//! A URL that does not map to a managed key is intentionally *not* an error:
//! pipeline operations treat it as a benign no-op and return the input
//! unchanged (or `None`), so no variant exists for it here.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The target filename is already stored; caller-correctable.
    #[error("object `{0}` already exists")]
    Conflict(String),

    /// The payload crossed the configured size cap, detected mid-stream.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Key failed validation (empty, traversal, too much nesting).
    #[error("invalid object key `{0}`")]
    InvalidKey(String),

    /// Image bytes could not be decoded or analyzed.
    #[error("unprocessable media: {0}")]
    Unprocessable(String),

    /// Remote fetch failed (connect, status, or stream read).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Object store transport or auth failure; no local recovery.
    #[error("object store backend: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Fetch(err.to_string())
    }
}

pub type MediaResult<T> = Result<T, MediaError>;
