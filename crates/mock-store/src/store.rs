//! The in-memory gateway.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use store_core::{AuthError, Filter, Join, Query, Row, Session, StoreError, StoreGateway, UserId};

/// A registered account.
#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    secret: String,
    confirmed: bool,
}

/// Which calls the next injected failure applies to.
#[derive(Debug, Default)]
struct FailurePlan {
    query: AtomicBool,
    insert: AtomicBool,
    update: AtomicBool,
    delete: AtomicBool,
}

/// In-memory [`StoreGateway`] implementation.
///
/// Rows live in per-table vectors; queries evaluate the shared filter
/// model from `store-core`. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<Inner>,
}

struct Inner {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    blobs: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<Session>>,
    sessions_tx: broadcast::Sender<Option<Session>>,
    fail: FailurePlan,
    rate_limited: AtomicBool,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        let (sessions_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(HashMap::new()),
                blobs: RwLock::new(HashMap::new()),
                accounts: RwLock::new(HashMap::new()),
                session: RwLock::new(None),
                sessions_tx,
                fail: FailurePlan::default(),
                rate_limited: AtomicBool::new(false),
            }),
        }
    }

    /// Register a confirmed account; returns its user id.
    pub async fn register_account(&self, identifier: &str, secret: &str) -> UserId {
        self.register(identifier, secret, true).await
    }

    /// Register an account that has not confirmed yet.
    pub async fn register_unconfirmed_account(&self, identifier: &str, secret: &str) -> UserId {
        self.register(identifier, secret, false).await
    }

    async fn register(&self, identifier: &str, secret: &str, confirmed: bool) -> UserId {
        let user_id = UserId::new(Uuid::new_v4().to_string());
        self.inner.accounts.write().await.insert(
            identifier.to_string(),
            Account {
                user_id: user_id.clone(),
                secret: secret.to_string(),
                confirmed,
            },
        );
        user_id
    }

    /// Make both auth operations fail with `RateLimited` while set.
    pub fn set_rate_limited(&self, limited: bool) {
        self.inner
            .rate_limited
            .store(limited, AtomicOrdering::SeqCst);
    }

    /// Make exactly the next query fail.
    pub fn fail_next_query(&self) {
        self.inner.fail.query.store(true, AtomicOrdering::SeqCst);
    }

    /// Make exactly the next insert fail.
    pub fn fail_next_insert(&self) {
        self.inner.fail.insert.store(true, AtomicOrdering::SeqCst);
    }

    /// Make exactly the next update fail.
    pub fn fail_next_update(&self) {
        self.inner.fail.update.store(true, AtomicOrdering::SeqCst);
    }

    /// Make exactly the next delete fail.
    pub fn fail_next_delete(&self) {
        self.inner.fail.delete.store(true, AtomicOrdering::SeqCst);
    }

    /// Number of rows currently in a table.
    pub async fn table_len(&self, table: &str) -> usize {
        self.inner
            .tables
            .read()
            .await
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Bytes stored under a bucket path, if any.
    pub async fn blob(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.inner
            .blobs
            .read()
            .await
            .get(bucket)
            .and_then(|b| b.get(path).cloned())
    }

    fn take_failure(&self, flag: &AtomicBool) -> bool {
        flag.swap(false, AtomicOrdering::SeqCst)
    }

    async fn embed_joins(&self, mut row: Row, joins: &[Join]) -> Option<Row> {
        let tables = self.inner.tables.read().await;
        for join in joins {
            let local = row.get(&join.local_column).cloned().unwrap_or(Value::Null);
            let counterpart = tables.get(&join.table).and_then(|rows| {
                rows.iter()
                    .find(|candidate| candidate.get(&join.foreign_column) == Some(&local))
            });
            match counterpart {
                Some(found) => {
                    row.as_object_mut()
                        .insert(join.alias.clone(), found.clone().into());
                }
                None if join.optional => {
                    row.as_object_mut().insert(join.alias.clone(), Value::Null);
                }
                None => return None,
            }
        }
        Some(row)
    }
}

/// Total order over JSON values for result ordering.
///
/// Nulls sort lowest; dates are ISO-shaped strings so string order is
/// chronological.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl StoreGateway for MockStore {
    async fn current_session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    fn subscribe_sessions(&self) -> broadcast::Receiver<Option<Session>> {
        self.inner.sessions_tx.subscribe()
    }

    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        if self.inner.rate_limited.load(AtomicOrdering::SeqCst) {
            return Err(AuthError::RateLimited);
        }
        let accounts = self.inner.accounts.read().await;
        let account = accounts
            .get(identifier)
            .ok_or(AuthError::InvalidCredentials)?;
        if account.secret != secret {
            return Err(AuthError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(AuthError::AccountUnconfirmed);
        }
        let session = Session::new(account.user_id.clone(), Uuid::new_v4().to_string());
        drop(accounts);

        *self.inner.session.write().await = Some(session.clone());
        let _ = self.inner.sessions_tx.send(Some(session.clone()));
        debug!(user = %session.user_id, "mock sign-in");
        Ok(session)
    }

    async fn sign_up(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        if self.inner.rate_limited.load(AtomicOrdering::SeqCst) {
            return Err(AuthError::RateLimited);
        }
        if self.inner.accounts.read().await.contains_key(identifier) {
            return Err(AuthError::AccountAlreadyExists);
        }
        self.register(identifier, secret, true).await;
        self.sign_in(identifier, secret).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.inner.session.write().await = None;
        let _ = self.inner.sessions_tx.send(None);
        debug!("mock sign-out");
        Ok(())
    }

    async fn query_rows(&self, query: Query) -> Result<Vec<Row>, StoreError> {
        if self.take_failure(&self.inner.fail.query) {
            return Err(StoreError::Read("injected query failure".to_string()));
        }

        let matching: Vec<Row> = {
            let tables = self.inner.tables.read().await;
            tables
                .get(&query.table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| query.filter.matches(row))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut results = Vec::with_capacity(matching.len());
        for row in matching {
            if let Some(embedded) = self.embed_joins(row, &query.joins).await {
                results.push(embedded);
            }
        }

        if let Some(order) = &query.order {
            results.sort_by(|a, b| {
                let cmp = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    cmp
                } else {
                    cmp.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn insert_row(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        if self.take_failure(&self.inner.fail.insert) {
            return Err(StoreError::Write("injected insert failure".to_string()));
        }
        let mut stored = row;
        if stored.get("id").is_none() {
            stored
                .as_object_mut()
                .insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.inner
            .tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update_rows(
        &self,
        table: &str,
        filter: Filter,
        changes: Row,
    ) -> Result<u64, StoreError> {
        if self.take_failure(&self.inner.fail.update) {
            return Err(StoreError::Write("injected update failure".to_string()));
        }
        let mut tables = self.inner.tables.write().await;
        let mut affected = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (column, value) in changes.as_object() {
                    row.as_object_mut().insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_rows(&self, table: &str, filter: Filter) -> Result<u64, StoreError> {
        if self.take_failure(&self.inner.fail.delete) {
            return Err(StoreError::Write("injected delete failure".to_string()));
        }
        let mut tables = self.inner.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.inner
            .blobs
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("mock://{}/{}", bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::Cond;

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = MockStore::new();
        let row = store
            .insert_row("friends", Row::new().set("friend_name", "Olimar"))
            .await
            .unwrap();
        assert!(row.opt_str("id").is_some());
        assert_eq!(store.table_len("friends").await, 1);
    }

    #[tokio::test]
    async fn test_query_filter_order_limit() {
        let store = MockStore::new();
        for (id, date) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            store
                .insert_row(
                    "user_postcards",
                    Row::new()
                        .set("id", id)
                        .set("user_id", "u1")
                        .set("collected_date", date),
                )
                .await
                .unwrap();
        }
        store
            .insert_row(
                "user_postcards",
                Row::new().set("user_id", "u2").set("collected_date", "2024-04-01"),
            )
            .await
            .unwrap();

        let rows = store
            .query_rows(
                Query::table("user_postcards")
                    .eq("user_id", "u1")
                    .order_desc("collected_date")
                    .limit(2),
            )
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.opt_str("id").unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_required_join_drops_orphans() {
        let store = MockStore::new();
        store
            .insert_row("postcards", Row::new().set("id", "p1").set("title", "Reef"))
            .await
            .unwrap();
        store
            .insert_row(
                "user_postcards",
                Row::new().set("user_id", "u1").set("postcard_id", "p1"),
            )
            .await
            .unwrap();
        store
            .insert_row(
                "user_postcards",
                Row::new().set("user_id", "u1").set("postcard_id", "gone"),
            )
            .await
            .unwrap();

        let rows = store
            .query_rows(
                Query::table("user_postcards")
                    .eq("user_id", "u1")
                    .join(Join::required("postcards", "postcard", "postcard_id")),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let nested = rows[0].nested("postcard").unwrap();
        assert_eq!(nested.opt_str("title"), Some("Reef"));
    }

    #[tokio::test]
    async fn test_optional_join_embeds_null() {
        let store = MockStore::new();
        store
            .insert_row(
                "friends",
                Row::new().set("user_id", "u1").set_null("friend_id"),
            )
            .await
            .unwrap();

        let rows = store
            .query_rows(
                Query::table("friends")
                    .eq("user_id", "u1")
                    .join(Join::optional("profiles", "profile", "friend_id")),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].nested("profile").is_none());
    }

    #[tokio::test]
    async fn test_disjunction_query() {
        let store = MockStore::new();
        for (sender, receiver) in [("me", "x"), ("y", "me"), ("y", "z")] {
            store
                .insert_row(
                    "exchange_records",
                    Row::new().set("sender_id", sender).set("receiver_id", receiver),
                )
                .await
                .unwrap();
        }
        let rows = store
            .query_rows(Query::table("exchange_records").any_of(vec![
                Cond::eq("sender_id", "me"),
                Cond::eq("receiver_id", "me"),
            ]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_auth_classification() {
        let store = MockStore::new();
        store.register_account("a@postbox.invalid", "pw").await;
        store
            .register_unconfirmed_account("b@postbox.invalid", "pw")
            .await;

        assert_eq!(
            store.sign_in("a@postbox.invalid", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            store.sign_in("b@postbox.invalid", "pw").await.unwrap_err(),
            AuthError::AccountUnconfirmed
        );
        assert_eq!(
            store.sign_up("a@postbox.invalid", "pw").await.unwrap_err(),
            AuthError::AccountAlreadyExists
        );

        store.set_rate_limited(true);
        assert_eq!(
            store.sign_in("a@postbox.invalid", "pw").await.unwrap_err(),
            AuthError::RateLimited
        );
        store.set_rate_limited(false);

        let session = store.sign_in("a@postbox.invalid", "pw").await.unwrap();
        assert_eq!(store.current_session().await, Some(session));
    }

    #[tokio::test]
    async fn test_session_broadcast() {
        let store = MockStore::new();
        store.register_account("a@postbox.invalid", "pw").await;
        let mut sessions = store.subscribe_sessions();

        store.sign_in("a@postbox.invalid", "pw").await.unwrap();
        assert!(sessions.recv().await.unwrap().is_some());

        store.sign_out().await.unwrap();
        assert!(sessions.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection_is_one_shot() {
        let store = MockStore::new();
        store.fail_next_update();
        let err = store
            .update_rows("friends", Filter::new(), Row::new().set("x", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert!(store
            .update_rows("friends", Filter::new(), Row::new().set("x", 1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_blob_roundtrip() {
        let store = MockStore::new();
        store
            .upload_blob("postcards", "u1/x.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(store.blob("postcards", "u1/x.png").await, Some(vec![1, 2, 3]));
        assert_eq!(
            store.public_url("postcards", "u1/x.png"),
            "mock://postcards/u1/x.png"
        );
    }
}
