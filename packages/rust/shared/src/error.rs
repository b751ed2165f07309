//! Error types for ragdeck.
//!
//! Library crates use [`RagDeckError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for all ragdeck operations.
#[derive(Debug, thiserror::Error)]
pub enum RagDeckError {
    /// The backend could not be reached, timed out, or dropped the body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("could not decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    /// A value could not be coerced to its declared type, or input was rejected.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The configuration tree was accessed before the initial load completed.
    #[error("configuration has not been loaded yet")]
    Unloaded,

    /// Local client settings could not be read or are invalid.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RagDeckError>;

/// Coarse classification of an error, used for operator-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Status,
    Decode,
    Validation,
    Local,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "network"),
            Self::Status => write!(f, "server"),
            Self::Decode => write!(f, "response"),
            Self::Validation => write!(f, "input"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl RagDeckError {
    /// Create a transport error from any displayable message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error for the given endpoint.
    pub fn decode(endpoint: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error for display.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Unloaded | Self::Config { .. } | Self::Io { .. } => ErrorKind::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RagDeckError::validation("chunking.chunk_size must be an integer");
        assert_eq!(
            err.to_string(),
            "validation error: chunking.chunk_size must be an integer"
        );

        let err = RagDeckError::Status {
            endpoint: "POST /build".into(),
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.to_string(), "POST /build returned HTTP 503: busy");
    }

    #[test]
    fn kinds_cover_the_taxonomy() {
        assert_eq!(RagDeckError::transport("timed out").kind(), ErrorKind::Transport);
        assert_eq!(RagDeckError::decode("GET /config", "eof").kind(), ErrorKind::Decode);
        assert_eq!(RagDeckError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(RagDeckError::Unloaded.kind(), ErrorKind::Local);
        assert_eq!(RagDeckError::config("bad toml").kind(), ErrorKind::Local);
    }
}
