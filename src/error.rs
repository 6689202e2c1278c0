use crate::types::FailureKind;
use thiserror::Error;

/// Fatal: the instance directory could not produce an endpoint list.
///
/// Nothing to scan means no partial report is attempted; this propagates
/// straight out of the invocation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("inventory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed endpoint list: {0}")]
    Malformed(String),
}

/// Fatal: configuration rejected before any dispatch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_schema_count must be non-negative, got {0}")]
    NegativeMaxSchemaCount(i64),
    #[error("schema_marker must be non-empty")]
    EmptyMarker,
    #[error("inspect_timeout must be non-zero")]
    ZeroTimeout,
}

/// Per-endpoint inspection failure. Never fatal: recorded as data in the
/// report for that endpoint only.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl InspectError {
    pub fn kind(&self) -> FailureKind {
        match self {
            InspectError::Connection(_) => FailureKind::Connection,
            InspectError::Query(_) => FailureKind::Query,
        }
    }
}
