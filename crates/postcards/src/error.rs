//! Error types for data operations.

use store_core::{AuthError, StoreError};
use thiserror::Error;

/// Errors surfaced by the stores.
///
/// Mutators return these instead of panicking; read failures additionally
/// leave the previous cache in place so stale-but-present data keeps
/// rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// A mutator was called without an active session.
    #[error("please sign in first")]
    NotAuthenticated,

    /// Input was rejected before any state was touched.
    #[error("{0}")]
    Validation(String),

    /// A remote read failed.
    #[error(transparent)]
    Read(StoreError),

    /// A remote write failed.
    #[error(transparent)]
    Write(StoreError),

    /// The authenticated identity has no backing profile record.
    ///
    /// This one triggers a forced sign-out as a side effect; a session
    /// without a profile is invalid for the rest of the system.
    #[error("account data is incomplete: {0}")]
    Integrity(String),

    /// An authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}
