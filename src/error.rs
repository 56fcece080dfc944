use thiserror::Error;

use crate::model::RemoteKind;

/// Errors raised by the reconciliation engine and its collaborators.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A resolver ran before the remote parent it needs existed.
    #[error("missing dependency: {kind} needs a remote {needs} id for {key}")]
    MissingDependency {
        kind: RemoteKind,
        needs: RemoteKind,
        key: String,
    },

    /// Network, timeout or 5xx-class failure from the ad server.
    #[error("transient ad server failure: {0}")]
    RemoteTransient(String),

    /// The ad server refused the request (validation, bad attribute, ...).
    #[error("ad server rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// Two remote entities share one natural key.
    #[error("ambiguous natural key: {count} remote {kind} entities named {key:?}")]
    AmbiguousNaturalKey {
        kind: RemoteKind,
        key: String,
        count: usize,
    },

    /// A stored remote id points at an entity carrying a different natural key.
    #[error("remote {kind} {id} is named {found:?}, expected {expected:?}")]
    NaturalKeyMismatch {
        kind: RemoteKind,
        id: i64,
        expected: String,
        found: String,
    },

    #[error("unknown local {what}: {id}")]
    UnknownRecord { what: &'static str, id: String },

    #[error("remote {kind} ids are not stored on local {target}")]
    InvalidLink {
        kind: RemoteKind,
        target: &'static str,
    },

    #[error("local store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::RemoteTransient(_))
    }

    pub(crate) fn missing(kind: RemoteKind, needs: RemoteKind, key: impl Into<String>) -> Self {
        SyncError::MissingDependency { kind, needs, key: key.into() }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
