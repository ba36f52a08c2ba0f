//! Error types for the Audius client
//!
//! Every upstream failure is folded into one of three kinds before it leaves
//! the crate; transport errors never cross the API.

/// Result type alias for Audius operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Audius network
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Network failure, non-2xx status or malformed payload from any upstream call
    #[error("Audius unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An upstream call exceeded its deadline
    #[error("Audius request timed out: {0}")]
    Timeout(String),

    /// The upstream has no resolvable media URL for the track
    #[error("Track not streamable: {0}")]
    NotStreamable(String),
}

impl Error {
    /// Create an upstream-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Fold a timeout into `UpstreamUnavailable`
    ///
    /// Used where the caller contract only knows about unavailability
    /// (directory lookup, playlist search).
    pub fn into_unavailable(self) -> Self {
        match self {
            Self::Timeout(msg) => Self::UpstreamUnavailable(format!("timed out: {}", msg)),
            other => other,
        }
    }

    /// HTTP status the routing layer reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UpstreamUnavailable(_) => 502,
            Self::Timeout(_) => 504,
            Self::NotStreamable(_) => 404,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::UpstreamUnavailable(format!("invalid upstream URL: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}
