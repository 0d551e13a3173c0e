//! Transport-level failures of the outbound model call.

pub mod http;

pub use http::build_http_client;

/// Failure of one request/response exchange with the remote model.
///
/// Every variant is retryable from the generation loop's point of view.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Remote call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status code, when the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
