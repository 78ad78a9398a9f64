// ❗ Error Taxonomy - Validation / Conflict / NotFound / Store
//
// Validation and Conflict are the caller's fault, NotFound only matters on
// read paths, Store errors are fatal to the request and never swallowed.

use std::time::Duration;
use thiserror::Error;

use crate::entities::{ReviewKind, ReviewerClass};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}

// ============================================================================
// VALIDATION (caller / protocol errors)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown account class: {0:?}")]
    UnknownAccountClass(String),

    #[error("unknown review kind: {0:?}")]
    UnknownReviewKind(String),

    #[error("unknown detail direction: {0:?}")]
    UnknownDirection(String),

    #[error("malformed item identity: {field} {reason}")]
    MalformedIdentity { field: &'static str, reason: String },

    #[error("invalid submitter id: {0}")]
    InvalidSubmitter(String),

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("rating sum overflow")]
    RatingOverflow,
}

// ============================================================================
// CONFLICT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("{submitter_id} already posted a {kind} review as a {class} reviewer")]
    DuplicateReview {
        submitter_id: String,
        class: ReviewerClass,
        kind: ReviewKind,
    },

    #[error("username already taken: {0}")]
    UsernameTaken(String),
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timed out after {0:?} waiting for the write lock")]
    Timeout(Duration),

    #[error("sqlite: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record {bucket}/{key}: {reason}")]
    Corrupt {
        bucket: &'static str,
        key: String,
        reason: String,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    /// Maps SQLite lock contention to `Timeout`, everything else to `Sqlite`.
    pub(crate) fn from_sqlite(err: rusqlite::Error, waited: Duration) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StoreError::Timeout(waited)
            }
            _ => StoreError::Sqlite(err),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}
