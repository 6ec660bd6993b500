//! Remote generation errors

/// Errors from a remote generator
///
/// None of these reach the caller of `PatchGenerator::generate`; they are
/// logged and the local fallback takes over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// No API key configured
    #[error("remote generation disabled: no API key configured")]
    Disabled,

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Call exceeded its deadline
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Response carried no text
    #[error("empty response")]
    EmptyResponse,

    /// Response text could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Check if a later attempt could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Disabled | Self::EmptyResponse | Self::InvalidResponse(_) => false,
        }
    }
}
