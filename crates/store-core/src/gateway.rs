//! The gateway trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{AuthError, StoreError};
use crate::query::{Filter, Query};
use crate::row::Row;
use crate::session::Session;

/// Interface to the hosted backend: auth, rows, and blob storage.
///
/// Implementations must be cheap to share (`Arc<dyn StoreGateway>`) and
/// must deliver every session transition - including the initial sign-in
/// and the confirmed sign-out - on the channel returned by
/// [`subscribe_sessions`](StoreGateway::subscribe_sessions).
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// The session currently held by the gateway, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Subscribe to session transitions.
    ///
    /// A `None` value means the session was invalidated or signed out.
    /// Sign-out is only broadcast once the backend confirmed the
    /// invalidation; there is no window where the channel says "signed
    /// out" while the old session is still accepted for writes.
    fn subscribe_sessions(&self) -> broadcast::Receiver<Option<Session>>;

    /// Sign in with a backend identifier and secret.
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError>;

    /// Register a new account.
    async fn sign_up(&self, identifier: &str, secret: &str) -> Result<Session, AuthError>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Run a query and return matching rows.
    async fn query_rows(&self, query: Query) -> Result<Vec<Row>, StoreError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert_row(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Update all rows matching the filter; returns the affected count.
    async fn update_rows(&self, table: &str, filter: Filter, changes: Row)
        -> Result<u64, StoreError>;

    /// Delete all rows matching the filter; returns the affected count.
    async fn delete_rows(&self, table: &str, filter: Filter) -> Result<u64, StoreError>;

    /// Store a binary object.
    async fn upload_blob(&self, bucket: &str, path: &str, bytes: Vec<u8>)
        -> Result<(), StoreError>;

    /// Durable public address for a stored object.
    ///
    /// Purely address derivation; does not check that the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
