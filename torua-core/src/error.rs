//! Shared error taxonomy for coordinator and node

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during cluster or storage operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum Error {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("not owner of shard {0}")]
    NotOwner(u32),

    #[error("no owner for shard {0}")]
    NoOwner(u32),

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("stale cluster state: got version {got}, have {have}")]
    StaleState { got: u64, have: u64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::NotOwner(_) => "not_owner",
            Error::NoOwner(_) => "no_owner",
            Error::UpstreamFailure(_) => "upstream_failure",
            Error::StaleState { .. } => "stale_state",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Internal(_) => "internal",
        }
    }

    /// HTTP status code this error maps to on the wire
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::NotOwner(_) => 410,
            Error::NoOwner(_) => 503,
            Error::UpstreamFailure(_) => 502,
            Error::StaleState { .. } => 409,
            Error::InvalidRequest(_) => 400,
            Error::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
