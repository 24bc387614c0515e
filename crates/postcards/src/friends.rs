//! The friend store: contact CRUD, avatar management, and the recency
//! enrichment for the friends view.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use store_core::{Filter, Join, Query, Row, StoreGateway, UserId};

use crate::cache::{Cache, Status};
use crate::error::DataError;
use crate::model::Friend;
use crate::naming;
use crate::rows::FriendRow;
use crate::session::SessionState;
use crate::tables;

/// How many recently-sent images are attached per friend.
const RECENT_SENT_LIMIT: usize = 3;

/// Published after a write that changes a friend's display identity.
///
/// Recipient names and avatars are denormalized into other collections'
/// read projections; subscribers refetch so every view reflecting a
/// friend's identity stays consistent. This event is the one
/// cross-repository coupling in the system.
#[derive(Debug, Clone)]
pub struct FriendIdentityChanged {
    /// Relationship row whose identity changed.
    pub friend_id: String,
}

/// Store for the current user's friend list.
pub struct FriendStore {
    gateway: Arc<dyn StoreGateway>,
    session: watch::Receiver<SessionState>,
    cache: Arc<Cache<Friend>>,
    status: Status,
    events_tx: broadcast::Sender<FriendIdentityChanged>,
    /// Serializes fetches so an older read can never install over a
    /// newer one.
    fetch_lock: tokio::sync::Mutex<()>,
}

impl FriendStore {
    pub(crate) fn new(
        gateway: Arc<dyn StoreGateway>,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self {
            gateway,
            session,
            cache: Arc::new(Cache::new()),
            status: Status::new(),
            events_tx,
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current cached friend list.
    pub async fn friends(&self) -> Vec<Friend> {
        self.cache.snapshot().await
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// The last read error, if the cache is stale because of one.
    pub fn last_error(&self) -> Option<DataError> {
        self.status.last_error()
    }

    /// Subscribe to identity-changed events (rename, avatar change).
    pub fn subscribe_identity_changes(&self) -> broadcast::Receiver<FriendIdentityChanged> {
        self.events_tx.subscribe()
    }

    fn current_user(&self) -> Option<UserId> {
        self.session.borrow().user.clone()
    }

    fn require_user(&self) -> Result<UserId, DataError> {
        self.current_user().ok_or(DataError::NotAuthenticated)
    }

    /// Load the friend list, then enrich each friend with the images of
    /// the last few cards sent to them.
    ///
    /// The enrichment is a deliberate per-friend fan-out rather than one
    /// joined query; at personal-contact-list scale the extra round
    /// trips are cheaper than fetching and discarding unrelated history.
    /// The follow-up queries run concurrently and their completions may
    /// arrive in any order; a failed follow-up leaves that friend's
    /// recency list empty rather than failing the whole fetch.
    pub async fn fetch(&self) -> Result<(), DataError> {
        let _serialized = self.fetch_lock.lock().await;
        let Some(user) = self.current_user() else {
            self.cache.clear().await;
            self.status.set_loading(false);
            return Ok(());
        };

        let epoch = self.cache.epoch();
        self.status.set_loading(true);
        let query = Query::table(tables::FRIENDS)
            .join(Join::optional(tables::PROFILES, "profile", "friend_id"))
            .eq("user_id", user.as_str());
        let result = self.gateway.query_rows(query).await;
        self.status.set_loading(false);

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                let err = DataError::Read(err);
                self.status.record(Some(err.clone()));
                return Err(err);
            }
        };

        let mut friends = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.decode::<FriendRow>(tables::FRIENDS) {
                Ok(decoded) => friends.push(decoded.into_friend()),
                Err(err) => {
                    let err = DataError::Read(err);
                    self.status.record(Some(err.clone()));
                    return Err(err);
                }
            }
        }

        let recents = futures::future::join_all(
            friends
                .iter()
                .map(|friend| self.recent_sent(user.clone(), friend.id.clone())),
        )
        .await;
        for (friend, recent) in friends.iter_mut().zip(recents) {
            friend.recent_sent = recent;
        }

        if !self.cache.set_if_epoch(epoch, friends).await {
            debug!("discarding friend snapshot fetched under a previous identity");
        }
        self.status.record(None);
        Ok(())
    }

    /// Images of the last few cards the user sent to one friend.
    async fn recent_sent(&self, user: UserId, friend_id: String) -> Vec<String> {
        let query = Query::table(tables::EXCHANGE_RECORDS)
            .join(Join::required(tables::POSTCARDS, "postcard", "postcard_id"))
            .eq("sender_id", user.as_str())
            .eq("receiver_id", friend_id.as_str())
            .order_desc("sent_date")
            .limit(RECENT_SENT_LIMIT);
        match self.gateway.query_rows(query).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| {
                    row.nested("postcard")
                        .and_then(|card| card.opt_str("image_url").map(str::to_string))
                })
                .collect(),
            Err(err) => {
                warn!("recency lookup for friend {} failed: {}", friend_id, err);
                Vec::new()
            }
        }
    }

    /// Flip a friend's favorite flag, optimistically.
    pub async fn toggle_favorite(&self, friend_id: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        let Some(current) = self
            .cache
            .snapshot()
            .await
            .iter()
            .find(|friend| friend.id == friend_id)
            .map(|friend| friend.is_favorite)
        else {
            return Ok(());
        };
        let next = !current;

        self.cache
            .optimistic_undo(
                |items| set_favorite(items, friend_id, next),
                |items| set_favorite(items, friend_id, current),
                async {
                    self.gateway
                        .update_rows(
                            tables::FRIENDS,
                            Filter::new().eq("user_id", user.as_str()).eq("id", friend_id),
                            Row::new().set("is_favorite", next),
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
            )
            .await
    }

    /// Add a contact by name, with a placeholder avatar derived from it,
    /// then refetch.
    pub async fn create(&self, name: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DataError::Validation("name must not be empty".to_string()));
        }
        self.gateway
            .insert_row(
                tables::FRIENDS,
                Row::new()
                    .set("user_id", user.as_str())
                    .set("friend_name", name)
                    .set("friend_avatar", naming::placeholder_avatar(name)),
            )
            .await
            .map_err(DataError::Write)?;
        self.fetch().await
    }

    /// Remove the relationship row, then refetch.
    ///
    /// Shared postcard entities are never touched by this.
    pub async fn delete(&self, friend_id: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        self.gateway
            .delete_rows(
                tables::FRIENDS,
                Filter::new().eq("user_id", user.as_str()).eq("id", friend_id),
            )
            .await
            .map_err(DataError::Write)?;
        self.fetch().await
    }

    /// Rename a friend, optimistically; publishes an identity-changed
    /// event on success.
    pub async fn rename(&self, friend_id: &str, new_name: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        let name = new_name.trim().to_string();
        if name.is_empty() {
            return Err(DataError::Validation("name must not be empty".to_string()));
        }
        let applied = name.clone();

        self.cache
            .optimistic_refetch(
                |items| {
                    if let Some(friend) = items.iter_mut().find(|friend| friend.id == friend_id) {
                        friend.name = applied;
                    }
                },
                async {
                    self.gateway
                        .update_rows(
                            tables::FRIENDS,
                            Filter::new().eq("user_id", user.as_str()).eq("id", friend_id),
                            Row::new().set("friend_name", name.as_str()),
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
                || self.fetch(),
            )
            .await?;

        self.publish_identity_change(friend_id);
        Ok(())
    }

    /// Upload a custom avatar and store its address, optimistically;
    /// publishes an identity-changed event on success.
    pub async fn set_avatar(
        &self,
        friend_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DataError> {
        let user = self.require_user()?;
        let nonce = Utc::now().timestamp_millis();
        let path = match file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => {
                format!("{}/{}_{}.{}", user.as_str(), friend_id, nonce, ext)
            }
            _ => format!("{}/{}_{}", user.as_str(), friend_id, nonce),
        };
        self.gateway
            .upload_blob(tables::AVATAR_BUCKET, &path, bytes)
            .await
            .map_err(DataError::Write)?;
        let avatar_url = self.gateway.public_url(tables::AVATAR_BUCKET, &path);
        let applied = avatar_url.clone();

        self.cache
            .optimistic_refetch(
                |items| {
                    if let Some(friend) = items.iter_mut().find(|friend| friend.id == friend_id) {
                        friend.avatar_url = Some(applied);
                    }
                },
                async {
                    self.gateway
                        .update_rows(
                            tables::FRIENDS,
                            Filter::new().eq("user_id", user.as_str()).eq("id", friend_id),
                            Row::new().set("friend_avatar", avatar_url.as_str()),
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
                || self.fetch(),
            )
            .await?;

        self.publish_identity_change(friend_id);
        Ok(())
    }

    /// Clear the stored avatar address, optimistically; the view layer
    /// regenerates a deterministic placeholder from the name.
    pub async fn reset_avatar(&self, friend_id: &str) -> Result<(), DataError> {
        let user = self.require_user()?;

        self.cache
            .optimistic_refetch(
                |items| {
                    if let Some(friend) = items.iter_mut().find(|friend| friend.id == friend_id) {
                        friend.avatar_url = None;
                    }
                },
                async {
                    self.gateway
                        .update_rows(
                            tables::FRIENDS,
                            Filter::new().eq("user_id", user.as_str()).eq("id", friend_id),
                            Row::new().set_null("friend_avatar"),
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
                || self.fetch(),
            )
            .await
    }

    /// Friends whose name contains the input, case-insensitively, in
    /// display order. Empty input suggests nothing.
    pub async fn suggestions(&self, input: &str) -> Vec<Friend> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<Friend> = self
            .cache
            .snapshot()
            .await
            .into_iter()
            .filter(|friend| friend.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| naming::compare_names(&a.name, &b.name));
        matches
    }

    fn publish_identity_change(&self, friend_id: &str) {
        let _ = self.events_tx.send(FriendIdentityChanged {
            friend_id: friend_id.to_string(),
        });
    }

    pub(crate) async fn apply_session(&self, state: &SessionState) {
        self.cache.bump_epoch();
        if state.user.is_none() {
            self.cache.clear().await;
            self.status.record(None);
        } else if let Err(err) = self.fetch().await {
            warn!("friend refetch after identity change failed: {}", err);
        }
    }

    pub(crate) fn cache_handle(&self) -> Arc<Cache<Friend>> {
        self.cache.clone()
    }
}

fn set_favorite(items: &mut [Friend], friend_id: &str, value: bool) {
    if let Some(friend) = items.iter_mut().find(|friend| friend.id == friend_id) {
        friend.is_favorite = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{derived_identifier, SessionManager};
    use mock_store::MockStore;

    async fn signed_in_store() -> (Arc<MockStore>, SessionManager, FriendStore) {
        let gateway = Arc::new(MockStore::new());
        gateway
            .register_account(&derived_identifier("pika"), "pw")
            .await;
        let manager = SessionManager::start(gateway.clone()).await;
        manager.sign_in("pika", "pw").await.unwrap();
        let store = FriendStore::new(gateway.clone(), manager.subscribe());
        (gateway, manager, store)
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (_gateway, _manager, store) = signed_in_store().await;
        store.create("Olimar").await.unwrap();
        let friends = store.friends().await;
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].name, "Olimar");
        assert!(!friends[0].has_custom_avatar());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_gateway, _manager, store) = signed_in_store().await;
        assert!(matches!(
            store.create("   ").await.unwrap_err(),
            DataError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_names_are_allowed() {
        let (_gateway, _manager, store) = signed_in_store().await;
        store.create("Lin").await.unwrap();
        store.create("Lin").await.unwrap();
        let friends = store.friends().await;
        assert_eq!(friends.len(), 2);
        assert_ne!(friends[0].id, friends[1].id);
    }

    #[tokio::test]
    async fn test_recency_enrichment() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        store.create("Olimar").await.unwrap();
        let friend_id = store.friends().await[0].id.clone();

        for (card, date) in [("c1", "2024-01-01T00:00:00Z"), ("c2", "2024-01-02T00:00:00Z")] {
            gateway
                .insert_row(
                    tables::POSTCARDS,
                    Row::new()
                        .set("id", card)
                        .set("image_url", format!("https://img/{}.png", card)),
                )
                .await
                .unwrap();
            gateway
                .insert_row(
                    tables::EXCHANGE_RECORDS,
                    Row::new()
                        .set("sender_id", user.as_str())
                        .set("receiver_id", friend_id.as_str())
                        .set("postcard_id", card)
                        .set("sent_date", date),
                )
                .await
                .unwrap();
        }

        store.fetch().await.unwrap();
        let friends = store.friends().await;
        assert_eq!(
            friends[0].recent_sent,
            vec!["https://img/c2.png", "https://img/c1.png"]
        );
    }

    #[tokio::test]
    async fn test_rename_publishes_identity_change() {
        let (_gateway, _manager, store) = signed_in_store().await;
        store.create("Olimar").await.unwrap();
        let friend_id = store.friends().await[0].id.clone();
        let mut events = store.subscribe_identity_changes();

        store.rename(&friend_id, " Captain Olimar ").await.unwrap();
        assert_eq!(store.friends().await[0].name, "Captain Olimar");
        assert_eq!(events.recv().await.unwrap().friend_id, friend_id);
    }

    #[tokio::test]
    async fn test_rename_failure_resyncs_and_skips_event() {
        let (gateway, _manager, store) = signed_in_store().await;
        store.create("Olimar").await.unwrap();
        let friend_id = store.friends().await[0].id.clone();
        let mut events = store.subscribe_identity_changes();

        gateway.fail_next_update();
        assert!(store.rename(&friend_id, "Louie").await.is_err());
        // Resynchronized from the store: original name intact.
        assert_eq!(store.friends().await[0].name, "Olimar");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_set_and_reset_avatar() {
        let (gateway, _manager, store) = signed_in_store().await;
        store.create("Olimar").await.unwrap();
        let friend_id = store.friends().await[0].id.clone();
        let mut events = store.subscribe_identity_changes();

        store
            .set_avatar(&friend_id, "portrait.jpg", vec![9, 9])
            .await
            .unwrap();
        let friend = &store.friends().await[0];
        assert!(friend.has_custom_avatar());
        assert!(friend.avatar().ends_with(".jpg"));
        assert_eq!(events.recv().await.unwrap().friend_id, friend_id);

        store.reset_avatar(&friend_id).await.unwrap();
        let friend = &store.friends().await[0];
        assert!(!friend.has_custom_avatar());
        assert!(friend.avatar().contains("ui-avatars.com"));

        // Row cleared remotely too.
        let rows = gateway
            .query_rows(Query::table(tables::FRIENDS).eq("id", friend_id.as_str()))
            .await
            .unwrap();
        assert_eq!(rows[0].opt_str("friend_avatar"), None);
    }

    #[tokio::test]
    async fn test_toggle_favorite_rolls_back_on_failure() {
        let (gateway, _manager, store) = signed_in_store().await;
        store.create("Olimar").await.unwrap();
        let friend_id = store.friends().await[0].id.clone();

        gateway.fail_next_update();
        assert!(store.toggle_favorite(&friend_id).await.is_err());
        assert!(!store.friends().await[0].is_favorite);
    }

    #[tokio::test]
    async fn test_suggestions_are_filtered_and_ordered() {
        let (_gateway, _manager, store) = signed_in_store().await;
        for name in ["Brittany", "amy", "Alph"] {
            store.create(name).await.unwrap();
        }
        let names: Vec<String> = store
            .suggestions("a")
            .await
            .into_iter()
            .map(|friend| friend.name)
            .collect();
        // Substring match is case-insensitive; results in display order.
        assert_eq!(names, vec!["Alph", "amy", "Brittany"]);

        assert!(store.suggestions("  ").await.is_empty());
    }
}
