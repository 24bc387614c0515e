//! The postcard store: CRUD, favorite toggling, and recipient
//! annotation for the collected-postcard list.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use store_core::{Filter, Join, Query, Row, StoreGateway, UserId};

use crate::cache::{Cache, Status};
use crate::error::DataError;
use crate::model::{encode_sent_to, Category, Friend, Postcard};
use crate::rows::CollectedRow;
use crate::session::SessionState;
use crate::tables;

/// Fields for a new postcard upload.
#[derive(Debug, Clone)]
pub struct NewPostcard {
    /// Title of the card.
    pub title: String,
    /// Place depicted.
    pub location: String,
    /// Country of the place.
    pub country: String,
    /// Image address (from [`PostcardStore::upload_image`]).
    pub image_url: String,
    /// Free-text description.
    pub description: String,
    /// Accent color.
    pub color: String,
    /// Category tag.
    pub category: Category,
    /// Collected date.
    pub collected: NaiveDate,
    /// Recipients the card was already sent to, if any.
    pub sent_to: Vec<String>,
}

/// Partial edit of a postcard's descriptive fields.
///
/// Title, location, country, and description live on the shared entity;
/// the collected date lives on the caller's relationship row.
#[derive(Debug, Clone, Default)]
pub struct PostcardChanges {
    /// New title.
    pub title: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New country.
    pub country: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New collected date.
    pub collected: Option<NaiveDate>,
}

impl PostcardChanges {
    fn entity_row(&self) -> Row {
        let mut row = Row::new();
        if let Some(title) = &self.title {
            row = row.set("title", title.as_str());
        }
        if let Some(location) = &self.location {
            row = row.set("location", location.as_str());
        }
        if let Some(country) = &self.country {
            row = row.set("country", country.as_str());
        }
        if let Some(description) = &self.description {
            row = row.set("description", description.as_str());
        }
        row
    }
}

/// Store for the current user's collected postcards.
///
/// Holds the canonical in-memory list every screen observes. All
/// mutators require an active session and return an explicit outcome
/// instead of panicking.
pub struct PostcardStore {
    gateway: Arc<dyn StoreGateway>,
    session: watch::Receiver<SessionState>,
    cache: Arc<Cache<Postcard>>,
    /// Read-only view of the friend list, for recipient validation.
    friends: Arc<Cache<Friend>>,
    status: Status,
    /// Serializes fetches so an older read can never install over a
    /// newer one.
    fetch_lock: tokio::sync::Mutex<()>,
}

impl PostcardStore {
    pub(crate) fn new(
        gateway: Arc<dyn StoreGateway>,
        session: watch::Receiver<SessionState>,
        friends: Arc<Cache<Friend>>,
    ) -> Self {
        Self {
            gateway,
            session,
            cache: Arc::new(Cache::new()),
            friends,
            status: Status::new(),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current cached collection, newest first.
    pub async fn postcards(&self) -> Vec<Postcard> {
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

    fn current_user(&self) -> Option<UserId> {
        self.session.borrow().user.clone()
    }

    fn require_user(&self) -> Result<UserId, DataError> {
        self.current_user().ok_or(DataError::NotAuthenticated)
    }

    /// Load the user's collection relationships joined with their
    /// postcard entities, newest collected first.
    ///
    /// With no current user this clears the cache and exits without
    /// error. A failed read keeps the previous cache and records the
    /// error instead.
    pub async fn fetch(&self) -> Result<(), DataError> {
        let _serialized = self.fetch_lock.lock().await;
        let Some(user) = self.current_user() else {
            self.cache.clear().await;
            self.status.set_loading(false);
            return Ok(());
        };

        let epoch = self.cache.epoch();
        self.status.set_loading(true);
        let query = Query::table(tables::USER_POSTCARDS)
            .join(Join::required(tables::POSTCARDS, "postcard", "postcard_id"))
            .eq("user_id", user.as_str())
            .order_desc("collected_date");
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

        let mut cards = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.decode::<CollectedRow>(tables::USER_POSTCARDS) {
                Ok(decoded) => cards.push(decoded.into_postcard()),
                Err(err) => {
                    let err = DataError::Read(err);
                    self.status.record(Some(err.clone()));
                    return Err(err);
                }
            }
        }

        if !self.cache.set_if_epoch(epoch, cards).await {
            debug!("discarding postcard snapshot fetched under a previous identity");
        }
        self.status.record(None);
        Ok(())
    }

    /// Flip the favorite flag, optimistically.
    ///
    /// A remote failure reverts the local flip and surfaces the error.
    pub async fn toggle_favorite(&self, postcard_id: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        let Some(current) = self
            .cache
            .snapshot()
            .await
            .iter()
            .find(|card| card.id == postcard_id)
            .map(|card| card.is_favorite)
        else {
            return Ok(());
        };
        let next = !current;

        self.cache
            .optimistic_undo(
                |items| set_favorite(items, postcard_id, next),
                |items| set_favorite(items, postcard_id, current),
                async {
                    self.gateway
                        .update_rows(
                            tables::USER_POSTCARDS,
                            Filter::new()
                                .eq("user_id", user.as_str())
                                .eq("postcard_id", postcard_id),
                            Row::new().set("is_favorite", next),
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
            )
            .await
    }

    /// Add an existing shared postcard to the user's collection, dated
    /// today, then refetch.
    pub async fn collect(&self, postcard_id: &str) -> Result<(), DataError> {
        let user = self.require_user()?;
        self.gateway
            .insert_row(
                tables::USER_POSTCARDS,
                Row::new()
                    .set("user_id", user.as_str())
                    .set("postcard_id", postcard_id)
                    .set("collected_date", Utc::now().date_naive().to_string()),
            )
            .await
            .map_err(DataError::Write)?;
        self.fetch().await
    }

    /// Store an image under a per-user random path, preserving the
    /// original extension, and return its durable public address.
    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, DataError> {
        let user = self.require_user()?;
        let object = Uuid::new_v4().to_string();
        let path = match file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => {
                format!("postcards/{}/{}.{}", user.as_str(), object, ext)
            }
            _ => format!("postcards/{}/{}", user.as_str(), object),
        };
        self.gateway
            .upload_blob(tables::POSTCARD_BUCKET, &path, bytes)
            .await
            .map_err(DataError::Write)?;
        Ok(self.gateway.public_url(tables::POSTCARD_BUCKET, &path))
    }

    /// Create the shared entity, then the collection relationship, then
    /// refetch.
    ///
    /// The two writes must run in that order because relationship-level
    /// access rules depend on the entity already existing. The pair is
    /// not transactional: if the relationship insert fails after the
    /// entity insert succeeded, the entity is left behind with no
    /// owner-visible relationship.
    pub async fn add_postcard(&self, card: NewPostcard) -> Result<(), DataError> {
        let user = self.require_user()?;
        let title = card.title.trim();
        if title.is_empty() {
            return Err(DataError::Validation("title must not be empty".to_string()));
        }
        if card.image_url.trim().is_empty() {
            return Err(DataError::Validation("an image is required".to_string()));
        }
        let recipients = self.canonical_recipients(&card.sent_to).await?;

        let entity = Row::new()
            .set("title", title)
            .set("location", card.location.as_str())
            .set("country", card.country.as_str())
            .set("image_url", card.image_url.as_str())
            .set("description", card.description.as_str())
            .set("color", card.color.as_str())
            .set("category", card.category.as_str())
            .set("is_special", card.category.is_special());
        let stored = self
            .gateway
            .insert_row(tables::POSTCARDS, entity)
            .await
            .map_err(DataError::Write)?;
        let entity_id = stored
            .str_field(tables::POSTCARDS, "id")
            .map_err(DataError::Write)?
            .to_string();

        let mut relationship = Row::new()
            .set("user_id", user.as_str())
            .set("postcard_id", entity_id.as_str())
            .set("collected_date", card.collected.to_string());
        relationship = match encode_sent_to(&recipients) {
            Some(value) => relationship.set("sent_to", value),
            None => relationship.set_null("sent_to"),
        };
        self.gateway
            .insert_row(tables::USER_POSTCARDS, relationship)
            .await
            .map_err(DataError::Write)?;

        self.fetch().await
    }

    /// Replace (or clear, with `None`) the recipient list,
    /// optimistically.
    ///
    /// Every recipient must match a current friend's name
    /// (case-insensitively); otherwise the call is rejected before any
    /// state is touched. Rollback on remote failure is a full refetch,
    /// because the prior list may not be cheaply reconstructable once
    /// replaced.
    pub async fn update_sent_to(
        &self,
        postcard_id: &str,
        recipients: Option<Vec<String>>,
    ) -> Result<(), DataError> {
        let user = self.require_user()?;
        let canonical = match recipients {
            None => Vec::new(),
            Some(list) => self.canonical_recipients(&list).await?,
        };
        let stored_value = encode_sent_to(&canonical);
        let applied = canonical.clone();

        self.cache
            .optimistic_refetch(
                |items| {
                    if let Some(card) = items.iter_mut().find(|card| card.id == postcard_id) {
                        card.sent_to = applied;
                    }
                },
                async {
                    let changes = match stored_value {
                        Some(value) => Row::new().set("sent_to", value),
                        None => Row::new().set_null("sent_to"),
                    };
                    self.gateway
                        .update_rows(
                            tables::USER_POSTCARDS,
                            Filter::new()
                                .eq("user_id", user.as_str())
                                .eq("postcard_id", postcard_id),
                            changes,
                        )
                        .await
                        .map_err(DataError::Write)?;
                    Ok(())
                },
                || self.fetch(),
            )
            .await
    }

    /// Apply a partial edit, optimistically.
    ///
    /// Entity-level fields and the relationship-level date are written
    /// separately; any failure resynchronizes with a full refetch.
    pub async fn update_postcard(
        &self,
        postcard_id: &str,
        changes: PostcardChanges,
    ) -> Result<(), DataError> {
        let user = self.require_user()?;
        let applied = changes.clone();

        self.cache
            .optimistic_refetch(
                |items| {
                    if let Some(card) = items.iter_mut().find(|card| card.id == postcard_id) {
                        if let Some(title) = applied.title {
                            card.title = title;
                        }
                        if let Some(location) = applied.location {
                            card.location = location;
                        }
                        if let Some(country) = applied.country {
                            card.country = country;
                        }
                        if let Some(description) = applied.description {
                            card.description = description;
                        }
                        if let Some(collected) = applied.collected {
                            card.collected = collected;
                        }
                    }
                },
                async {
                    let entity = changes.entity_row();
                    if !entity.is_empty() {
                        self.gateway
                            .update_rows(
                                tables::POSTCARDS,
                                Filter::new().eq("id", postcard_id),
                                entity,
                            )
                            .await
                            .map_err(DataError::Write)?;
                    }
                    if let Some(collected) = changes.collected {
                        self.gateway
                            .update_rows(
                                tables::USER_POSTCARDS,
                                Filter::new()
                                    .eq("user_id", user.as_str())
                                    .eq("postcard_id", postcard_id),
                                Row::new().set("collected_date", collected.to_string()),
                            )
                            .await
                            .map_err(DataError::Write)?;
                    }
                    Ok(())
                },
                || self.fetch(),
            )
            .await
    }

    /// Delete the shared entity; relationship rows cascade server-side.
    ///
    /// Not optimistic: entity deletion may be rejected if the ownership
    /// check fails, so the local list is only filtered after confirmed
    /// success.
    pub async fn delete(&self, postcard_id: &str) -> Result<(), DataError> {
        self.require_user()?;
        self.gateway
            .delete_rows(tables::POSTCARDS, Filter::new().eq("id", postcard_id))
            .await
            .map_err(DataError::Write)?;
        self.cache
            .mutate(|items| items.retain(|card| card.id != postcard_id))
            .await;
        Ok(())
    }

    /// Validate recipient names against the current friend list and
    /// canonicalize them to the friends' stored casing.
    async fn canonical_recipients(&self, recipients: &[String]) -> Result<Vec<String>, DataError> {
        let roster = self.friends.snapshot().await;
        let mut canonical: Vec<String> = Vec::new();
        for raw in recipients {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            let matched = roster
                .iter()
                .find(|friend| friend.name.to_lowercase() == name.to_lowercase());
            let Some(friend) = matched else {
                return Err(DataError::Validation(format!(
                    "'{}' is not in your friend list yet; add them first",
                    name
                )));
            };
            if canonical
                .iter()
                .any(|existing| existing.to_lowercase() == friend.name.to_lowercase())
            {
                return Err(DataError::Validation(format!(
                    "'{}' is already in the recipient list",
                    friend.name
                )));
            }
            canonical.push(friend.name.clone());
        }
        Ok(canonical)
    }

    pub(crate) async fn apply_session(&self, state: &SessionState) {
        self.cache.bump_epoch();
        if state.user.is_none() {
            self.cache.clear().await;
            self.status.record(None);
        } else if let Err(err) = self.fetch().await {
            warn!("postcard refetch after identity change failed: {}", err);
        }
    }

    pub(crate) fn cache_handle(&self) -> Arc<Cache<Postcard>> {
        self.cache.clone()
    }
}

fn set_favorite(items: &mut [Postcard], postcard_id: &str, value: bool) {
    if let Some(card) = items.iter_mut().find(|card| card.id == postcard_id) {
        card.is_favorite = value;
    }
}

/// Cards whose title or location contains the term, case-insensitively.
pub fn search<'a>(cards: &'a [Postcard], term: &str) -> Vec<&'a Postcard> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return cards.iter().collect();
    }
    cards
        .iter()
        .filter(|card| {
            card.title.to_lowercase().contains(&needle)
                || card.location.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Cards with the given category tag.
pub fn by_category(cards: &[Postcard], category: Category) -> Vec<&Postcard> {
    cards.iter().filter(|card| card.category == category).collect()
}

/// Favorite cards only.
pub fn favorites(cards: &[Postcard]) -> Vec<&Postcard> {
    cards.iter().filter(|card| card.is_favorite).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{derived_identifier, SessionManager};
    use mock_store::MockStore;

    async fn signed_in_store() -> (Arc<MockStore>, SessionManager, PostcardStore) {
        let gateway = Arc::new(MockStore::new());
        gateway
            .register_account(&derived_identifier("pika"), "pw")
            .await;
        let manager = SessionManager::start(gateway.clone()).await;
        manager.sign_in("pika", "pw").await.unwrap();
        let friends = Arc::new(Cache::new());
        let store = PostcardStore::new(gateway.clone(), manager.subscribe(), friends);
        (gateway, manager, store)
    }

    fn friend(id: &str, name: &str) -> Friend {
        Friend {
            id: id.to_string(),
            name: name.to_string(),
            avatar_url: None,
            is_favorite: false,
            recent_sent: Vec::new(),
        }
    }

    async fn seed_card(
        gateway: &MockStore,
        user: &str,
        entity_id: &str,
        title: &str,
        date: &str,
        favorite: bool,
    ) {
        use store_core::StoreGateway;
        gateway
            .insert_row(
                tables::POSTCARDS,
                Row::new()
                    .set("id", entity_id)
                    .set("title", title)
                    .set("location", "Forest of Hope")
                    .set("country", "PNF-404")
                    .set("image_url", format!("https://img/{}.png", entity_id)),
            )
            .await
            .unwrap();
        gateway
            .insert_row(
                tables::USER_POSTCARDS,
                Row::new()
                    .set("user_id", user)
                    .set("postcard_id", entity_id)
                    .set("collected_date", date)
                    .set("is_favorite", favorite),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Old", "2024-01-01", false).await;
        seed_card(&gateway, user.as_str(), "p2", "New", "2024-02-01", false).await;

        store.fetch().await.unwrap();
        let cards = store.postcards().await;
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "New");
        assert_eq!(cards[1].title, "Old");
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_without_user_clears() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();
        assert_eq!(store.postcards().await.len(), 1);

        manager.sign_out().await.unwrap();
        store.fetch().await.unwrap();
        assert!(store.postcards().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_is_idempotent() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();

        store.toggle_favorite("p1").await.unwrap();
        assert!(store.postcards().await[0].is_favorite);
        store.toggle_favorite("p1").await.unwrap();
        assert!(!store.postcards().await[0].is_favorite);
    }

    #[tokio::test]
    async fn test_toggle_favorite_rolls_back_on_failure() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();

        gateway.fail_next_update();
        let err = store.toggle_favorite("p1").await.unwrap_err();
        assert!(matches!(err, DataError::Write(_)));
        assert!(!store.postcards().await[0].is_favorite, "flip must be reverted");
    }

    #[tokio::test]
    async fn test_update_sent_to_rejects_unknown_recipient() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();
        store.friends.set(vec![friend("f1", "Olimar")]).await;

        let err = store
            .update_sent_to("p1", Some(vec!["Louie".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        // Neither local nor remote state was touched.
        assert!(store.postcards().await[0].sent_to.is_empty());
        let rows = gateway
            .query_rows(Query::table(tables::USER_POSTCARDS).eq("user_id", user.as_str()))
            .await
            .unwrap();
        assert_eq!(rows[0].opt_str("sent_to"), None);
    }

    #[tokio::test]
    async fn test_update_sent_to_canonicalizes_and_stores() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();
        store
            .friends
            .set(vec![friend("f1", "Olimar"), friend("f2", "Louie")])
            .await;

        store
            .update_sent_to("p1", Some(vec!["olimar".to_string(), " Louie ".to_string()]))
            .await
            .unwrap();
        assert_eq!(store.postcards().await[0].sent_to, vec!["Olimar", "Louie"]);
        let rows = gateway
            .query_rows(Query::table(tables::USER_POSTCARDS).eq("user_id", user.as_str()))
            .await
            .unwrap();
        assert_eq!(rows[0].opt_str("sent_to"), Some("Olimar, Louie"));

        // Clearing stores null again.
        store.update_sent_to("p1", None).await.unwrap();
        let rows = gateway
            .query_rows(Query::table(tables::USER_POSTCARDS).eq("user_id", user.as_str()))
            .await
            .unwrap();
        assert_eq!(rows[0].opt_str("sent_to"), None);
    }

    #[tokio::test]
    async fn test_add_postcard_writes_entity_then_relationship() {
        let (gateway, manager, store) = signed_in_store().await;
        let _ = manager;
        store.friends.set(vec![friend("f1", "Olimar")]).await;

        store
            .add_postcard(NewPostcard {
                title: "Central Park Fountain".to_string(),
                location: "New York".to_string(),
                country: "USA".to_string(),
                image_url: "https://img/fountain.png".to_string(),
                description: String::new(),
                color: "#0ea5e9".to_string(),
                category: Category::Adventure,
                collected: "2024-01-02".parse().unwrap(),
                sent_to: vec!["Olimar".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(gateway.table_len(tables::POSTCARDS).await, 1);
        assert_eq!(gateway.table_len(tables::USER_POSTCARDS).await, 1);
        let cards = store.postcards().await;
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Central Park Fountain");
        assert_eq!(cards[0].sent_to, vec!["Olimar"]);
    }

    #[tokio::test]
    async fn test_add_postcard_requires_title() {
        let (_gateway, _manager, store) = signed_in_store().await;
        let err = store
            .add_postcard(NewPostcard {
                title: "  ".to_string(),
                location: String::new(),
                country: String::new(),
                image_url: "https://img/x.png".to_string(),
                description: String::new(),
                color: String::new(),
                category: Category::Mushroom,
                collected: "2024-01-02".parse().unwrap(),
                sent_to: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_is_not_optimistic() {
        let (gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        seed_card(&gateway, user.as_str(), "p1", "Reef", "2024-01-01", false).await;
        store.fetch().await.unwrap();

        gateway.fail_next_delete();
        assert!(store.delete("p1").await.is_err());
        assert_eq!(store.postcards().await.len(), 1, "kept until confirmed");

        store.delete("p1").await.unwrap();
        assert!(store.postcards().await.is_empty());
        assert_eq!(gateway.table_len(tables::POSTCARDS).await, 0);
    }

    #[tokio::test]
    async fn test_mutators_require_session() {
        let (_gateway, manager, store) = signed_in_store().await;
        manager.sign_out().await.unwrap();
        assert_eq!(
            store.toggle_favorite("p1").await.unwrap_err(),
            DataError::NotAuthenticated
        );
        assert_eq!(
            store.collect("p1").await.unwrap_err(),
            DataError::NotAuthenticated
        );
        assert_eq!(
            store.upload_image("a.png", vec![1]).await.unwrap_err(),
            DataError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_upload_image_preserves_extension() {
        let (_gateway, manager, store) = signed_in_store().await;
        let user = manager.current_user().unwrap();
        let url = store.upload_image("shore.png", vec![1, 2, 3]).await.unwrap();
        assert!(url.starts_with(&format!("mock://postcards/postcards/{}/", user.as_str())));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_search_and_filters() {
        let cards = vec![
            Postcard {
                id: "p1".to_string(),
                title: "Harbor Lights".to_string(),
                location: "Lisbon".to_string(),
                country: "Portugal".to_string(),
                image_url: String::new(),
                collected: "2024-01-01".parse().unwrap(),
                description: String::new(),
                color: String::new(),
                category: Category::Adventure,
                is_special: false,
                is_favorite: true,
                sent_to: Vec::new(),
            },
            Postcard {
                id: "p2".to_string(),
                title: "Petal Field".to_string(),
                location: "Kyoto".to_string(),
                country: "Japan".to_string(),
                image_url: String::new(),
                collected: "2024-01-02".parse().unwrap(),
                description: String::new(),
                color: String::new(),
                category: Category::Petal,
                is_special: true,
                is_favorite: false,
                sent_to: Vec::new(),
            },
        ];
        assert_eq!(search(&cards, "lisbon").len(), 1);
        assert_eq!(search(&cards, "").len(), 2);
        assert_eq!(by_category(&cards, Category::Petal)[0].id, "p2");
        assert_eq!(favorites(&cards)[0].id, "p1");
    }
}
