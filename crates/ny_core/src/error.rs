use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Schema violation on field `{field}`: expected {expected}")]
    SchemaViolation { field: String, expected: String },

    #[error("Unknown language code: {0}")]
    UnknownLanguageCode(String),

    #[error("Image generation failed: {0}")]
    ImageGenerationFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Publish failed: {cause}")]
    PublishFailed { cause: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn schema_violation(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn publish_failed(cause: impl fmt::Display) -> Self {
        Self::PublishFailed {
            cause: cause.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Error::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Error::UnknownLanguageCode(_) => ErrorKind::UnknownLanguageCode,
            Error::ImageGenerationFailed(_) => ErrorKind::ImageGenerationFailed,
            Error::TranscodeFailed(_) => ErrorKind::TranscodeFailed,
            Error::PublishFailed { .. } => ErrorKind::PublishFailed,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Config(_) => ErrorKind::Config,
            Error::Transport(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Http(_)
            | Error::External(_) => ErrorKind::Transport,
        }
    }

    /// Whether a collaborator may retry the call that produced this error.
    /// Content errors are never retryable.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Coarse tag for an [`Error`], used when reporting a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedResponse,
    SchemaViolation,
    UnknownLanguageCode,
    ImageGenerationFailed,
    TranscodeFailed,
    PublishFailed,
    Transport,
    Cancelled,
    Timeout,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::UnknownLanguageCode => "unknown_language_code",
            ErrorKind::ImageGenerationFailed => "image_generation_failed",
            ErrorKind::TranscodeFailed => "transcode_failed",
            ErrorKind::PublishFailed => "publish_failed",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_names_field() {
        let err = Error::schema_violation("headline", "string");
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(
            err.to_string(),
            "Schema violation on field `headline`: expected string"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::Transport("connection reset".to_string()).is_transient());
        assert!(!Error::MalformedResponse("no json".to_string()).is_transient());
        assert!(!Error::schema_violation("body", "string").is_transient());
        assert_eq!(ErrorKind::PublishFailed.to_string(), "publish_failed");
    }
}
