//! Error taxonomy for the recommendation and playback core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoodifyError>;

/// Failures reported at component boundaries.
///
/// None of these is fatal to the process: the session actor logs them and
/// carries on with whatever state it already had.
#[derive(Error, Debug, Clone)]
pub enum MoodifyError {
    /// Token missing at request time, or rejected by the remote service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport failure without an HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP response
    #[error("HTTP error (status {status}): {message}")]
    HttpStatus { status: u16, message: String },

    /// Response body was not valid JSON or had an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Remote player rejected a specific track
    #[error("Failed to enqueue {track}: {reason}")]
    Enqueue { track: String, reason: String },

    /// Remote player unreachable, handshake failed, or not connected
    #[error("Connection error: {0}")]
    Connection(String),

    /// Unusable configuration value, such as a malformed API base URL
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MoodifyError {
    /// Maps a non-success status to the matching variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Auth(message.into()),
            _ => Self::HttpStatus {
                status,
                message: message.into(),
            },
        }
    }

    /// Transport failures, rate limiting and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<reqwest::Error> for MoodifyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::Parse(err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MoodifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(MoodifyError::from_status(401, "expired").is_auth_error());
        assert!(MoodifyError::from_status(403, "forbidden").is_auth_error());
        assert!(matches!(
            MoodifyError::from_status(404, "missing"),
            MoodifyError::HttpStatus { status: 404, .. }
        ));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(MoodifyError::Network("reset".into()).is_retryable());
        assert!(MoodifyError::from_status(429, "slow down").is_retryable());
        assert!(MoodifyError::from_status(503, "unavailable").is_retryable());
        assert!(!MoodifyError::from_status(400, "bad request").is_retryable());
        assert!(!MoodifyError::Auth("no token".into()).is_retryable());
        assert!(!MoodifyError::Parse("garbage".into()).is_retryable());
    }
}
