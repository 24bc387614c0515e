//! Error types shared by all gateway implementations.

use thiserror::Error;

/// Errors that can occur during authentication operations.
///
/// Backends classify their raw failure responses into these kinds so the
/// layers above can show a specific message per condition instead of the
/// provider's wording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Identifier/secret pair was rejected.
    #[error("wrong account or password")]
    InvalidCredentials,

    /// The account exists but has not been confirmed yet.
    #[error("account not confirmed yet")]
    AccountUnconfirmed,

    /// Registration attempted with an identifier that is already taken.
    #[error("account already registered")]
    AccountAlreadyExists,

    /// The backend is throttling auth attempts.
    #[error("too many attempts, try again later")]
    RateLimited,

    /// Unclassified backend message, passed through as-is.
    #[error("{0}")]
    Backend(String),
}

/// Errors that can occur during data and storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A read (query) against the backend failed.
    #[error("read failed: {0}")]
    Read(String),

    /// A write (insert/update/delete/upload) against the backend failed.
    #[error("write failed: {0}")]
    Write(String),

    /// A row was missing a field the caller requires.
    #[error("{table}: missing required field '{column}'")]
    MissingField {
        /// Collection the row came from.
        table: &'static str,
        /// Column that was absent or null.
        column: &'static str,
    },

    /// A row could not be decoded into its expected shape.
    #[error("{table}: bad row: {message}")]
    Decode {
        /// Collection the row came from.
        table: &'static str,
        /// Decoder message describing what was wrong.
        message: String,
    },

    /// A single-row lookup matched nothing.
    #[error("{table}: row not found")]
    NotFound {
        /// Collection that was queried.
        table: &'static str,
    },
}
