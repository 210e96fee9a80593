use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// Result alias that carries the custom [`SessionError`] type.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Common error type for the core crate.
///
/// Every variant is recoverable: request handlers turn them into a failed
/// reply instead of tearing the process down.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The profile text is empty or does not follow the record framing.
    #[error("malformed profile: {0}")]
    Parse(String),
    /// A record declares more `(key, value)` pairs than tokens remain.
    #[error(
        "element `{factory}` declares {declared} properties but only {available} tokens remain"
    )]
    PropertyCountMismatch {
        factory: String,
        declared: usize,
        available: usize,
    },
    #[error("profile describes more than {limit} elements")]
    TooManyElements { limit: usize },
    /// The engine has no factory for the requested element type.
    #[error("could not create element `{name}` from factory `{factory}`: {reason}")]
    ElementCreation {
        factory: String,
        name: String,
        reason: String,
    },
    #[error("could not set `{key}` on element `{element}`: {reason}")]
    Property {
        element: String,
        key: String,
        reason: String,
    },
    #[error("could not link `{upstream}` to `{downstream}`: {reason}")]
    Link {
        upstream: String,
        downstream: String,
        reason: String,
    },
    #[error("pipeline refused the {state} transition: {reason}")]
    StateChange { state: &'static str, reason: String },
    #[error("stream code {0} is neither audio (1) nor video (2)")]
    InvalidStreamKind(i32),
    #[error("state code {0} is not play (1), pause (2) or stop (3)")]
    InvalidStateCode(i32),
    #[error("no pipeline has been built yet")]
    NoActivePipeline,
    #[error("{mode} profile not found at {path}")]
    ProfileNotFound { mode: &'static str, path: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Stable, machine readable classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    PropertyCountMismatch,
    TooManyElements,
    ElementCreationError,
    PropertyError,
    LinkError,
    StateChangeError,
    InvalidStreamKind,
    InvalidStateCode,
    NoActivePipeline,
    ProfileNotFound,
    EngineError,
    IoError,
    ConfigError,
}

impl SessionError {
    /// Creates a parse error from the provided message.
    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    /// Wire-level code reported to remote callers for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::ParseError,
            Self::PropertyCountMismatch { .. } => ErrorKind::PropertyCountMismatch,
            Self::TooManyElements { .. } => ErrorKind::TooManyElements,
            Self::ElementCreation { .. } => ErrorKind::ElementCreationError,
            Self::Property { .. } => ErrorKind::PropertyError,
            Self::Link { .. } => ErrorKind::LinkError,
            Self::StateChange { .. } => ErrorKind::StateChangeError,
            Self::InvalidStreamKind(_) => ErrorKind::InvalidStreamKind,
            Self::InvalidStateCode(_) => ErrorKind::InvalidStateCode,
            Self::NoActivePipeline => ErrorKind::NoActivePipeline,
            Self::ProfileNotFound { .. } => ErrorKind::ProfileNotFound,
            Self::Engine(_) => ErrorKind::EngineError,
            Self::Io(_) => ErrorKind::IoError,
            Self::Config(_) => ErrorKind::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_serialised_in_snake_case() {
        let kind = SessionError::NoActivePipeline.kind();
        assert_eq!(
            serde_json::to_string(&kind).unwrap(),
            "\"no_active_pipeline\""
        );
    }

    #[test]
    fn mismatch_message_names_the_factory() {
        let err = SessionError::PropertyCountMismatch {
            factory: "filesrc".to_string(),
            declared: 2,
            available: 1,
        };
        assert!(format!("{err}").contains("filesrc"));
        assert_eq!(err.kind(), ErrorKind::PropertyCountMismatch);
    }
}
