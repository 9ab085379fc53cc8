//! Error types for endpoint resolution, snapshot fetching, and batch collection.

use thiserror::Error;

/// Result type alias for batch collection.
pub type CollectResult<T> = Result<T, CollectError>;

/// An address string that could not be turned into an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to parse address '{address}': {reason}")]
pub struct ResolutionError {
    pub address: String,
    pub reason: String,
}

impl ResolutionError {
    pub(crate) fn new(address: &str, reason: impl Into<String>) -> Self {
        Self {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Status,
    Decode,
    TypeMismatch,
}

/// Failure to obtain a usable snapshot from one endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to make HTTP request to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("unexpected HTTP status from {endpoint}: {status}")]
    Status {
        endpoint: String,
        status: http::StatusCode,
    },

    #[error("invalid snapshot from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("metric '{metric}' from {endpoint} is not numeric (found {found})")]
    TypeMismatch {
        endpoint: String,
        metric: String,
        found: &'static str,
    },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } => FetchErrorKind::Transport,
            FetchError::Status { .. } => FetchErrorKind::Status,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
            FetchError::TypeMismatch { .. } => FetchErrorKind::TypeMismatch,
        }
    }

    /// Base URL of the endpoint that failed.
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. }
            | FetchError::TypeMismatch { endpoint, .. } => endpoint,
        }
    }
}

/// Failure to set up the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("tls protocol version error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Errors that end a collection cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("collection task for {endpoint} exited without reporting")]
    WorkerLost { endpoint: String },
}

impl CollectError {
    /// The fetch failure behind this error, if any.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            CollectError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}
