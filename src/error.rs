//! The error type shared by every attendance operation.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt;
use thiserror::Error;

use crate::models::ActorId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input was malformed. Nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// A unique key was already taken. Reconciliation never returns this; a duplicate default
    /// record there means the work was already done.
    #[error("{0}")]
    Conflict(String),

    #[error("actor {actor} does not own course {course_id}")]
    Unauthorized { actor: ActorId, course_id: i32 },

    #[error("storage error: {0}")]
    Storage(#[from] DieselError),

    #[error("could not connect to `{url}`: {source}")]
    Connection {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("could not run migrations: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub(crate) fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Whether `err` is a unique violation on `column`, given as `table.column` the way SQLite names
/// it in the constraint message.
pub(crate) fn is_unique_violation_on(err: &DieselError, column: &str) -> bool {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => info
            .message()
            .strip_prefix("UNIQUE constraint failed: ")
            .is_some_and(|columns| columns.split(", ").any(|failed| failed == column)),
        _ => false,
    }
}
