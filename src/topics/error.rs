//! Error types for topic retrieval.

use thiserror::Error;

/// Why a single retrieval attempt failed.
///
/// Every variant is treated the same way by the store's stale fallback; the
/// split only matters for diagnostics. `Clone` so that callers waiting on a
/// shared in-flight fetch can each receive the outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The endpoint answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// The payload arrived but failed structural validation.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Local file source could not be read.
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl FetchError {
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
            Self::Io { .. } => "io",
        }
    }
}
