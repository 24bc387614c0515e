//! The profile store: single-record CRUD for the user's own display
//! identity, with forced sign-out on integrity violation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use store_core::{Filter, Query, Row, StoreGateway};

use crate::cache::Status;
use crate::error::DataError;
use crate::model::Profile;
use crate::rows::ProfileRow;
use crate::session::{SessionManager, SessionState};
use crate::tables;

/// Partial edit of the user's profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    /// New display name.
    pub username: Option<String>,
    /// New avatar address.
    pub avatar_url: Option<String>,
}

/// Store for the current user's profile record.
pub struct ProfileStore {
    gateway: Arc<dyn StoreGateway>,
    session: SessionManager,
    profile: RwLock<Option<Profile>>,
    status: Status,
}

impl ProfileStore {
    pub(crate) fn new(gateway: Arc<dyn StoreGateway>, session: SessionManager) -> Self {
        Self {
            gateway,
            session,
            profile: RwLock::new(None),
            status: Status::new(),
        }
    }

    /// The cached profile, if loaded.
    pub async fn profile(&self) -> Option<Profile> {
        self.profile.read().await.clone()
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// The last read error, if any.
    pub fn last_error(&self) -> Option<DataError> {
        self.status.last_error()
    }

    /// Load the profile row for the current user.
    ///
    /// An authenticated identity with no profile row is invalid for the
    /// rest of the system: this forces a sign-out and reports
    /// [`DataError::Integrity`] rather than leaving the UI
    /// authenticated-but-profile-less.
    pub async fn fetch(&self) -> Result<(), DataError> {
        let Some(user) = self.session.current_user() else {
            *self.profile.write().await = None;
            self.status.set_loading(false);
            return Ok(());
        };

        self.status.set_loading(true);
        let result = self
            .gateway
            .query_rows(Query::table(tables::PROFILES).eq("id", user.as_str()).limit(1))
            .await;
        self.status.set_loading(false);

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                let err = DataError::Read(err);
                self.status.record(Some(err.clone()));
                return Err(err);
            }
        };

        let Some(row) = rows.first() else {
            warn!(user = %user, "account has no profile record, forcing sign-out");
            if let Err(err) = self.session.sign_out().await {
                warn!("forced sign-out failed: {}", err);
            }
            *self.profile.write().await = None;
            let err = DataError::Integrity("no profile record for this account".to_string());
            self.status.record(Some(err.clone()));
            return Err(err);
        };

        let decoded: ProfileRow = row.decode(tables::PROFILES).map_err(DataError::Read)?;
        *self.profile.write().await = Some(decoded.into_profile());
        self.status.record(None);
        Ok(())
    }

    /// Update profile fields, then refetch.
    pub async fn update(&self, changes: ProfileChanges) -> Result<(), DataError> {
        let user = self
            .session
            .current_user()
            .ok_or(DataError::NotAuthenticated)?;
        let mut row = Row::new();
        if let Some(username) = &changes.username {
            row = row.set("username", username.as_str());
        }
        if let Some(avatar_url) = &changes.avatar_url {
            row = row.set("avatar", avatar_url.as_str());
        }
        if row.is_empty() {
            return Ok(());
        }
        self.gateway
            .update_rows(tables::PROFILES, Filter::new().eq("id", user.as_str()), row)
            .await
            .map_err(DataError::Write)?;
        self.fetch().await
    }

    /// Live count of the user's collected postcards.
    pub async fn postcard_count(&self) -> Result<usize, DataError> {
        let Some(user) = self.session.current_user() else {
            return Ok(0);
        };
        let rows = self
            .gateway
            .query_rows(Query::table(tables::USER_POSTCARDS).eq("user_id", user.as_str()))
            .await
            .map_err(DataError::Read)?;
        Ok(rows.len())
    }

    /// On identity change, drop the cached profile; the next profile
    /// screen visit fetches (and runs the integrity check) on demand.
    pub(crate) async fn apply_session(&self, state: &SessionState) {
        if state.user.is_none() {
            *self.profile.write().await = None;
            self.status.record(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::derived_identifier;
    use mock_store::MockStore;

    async fn signed_in() -> (Arc<MockStore>, SessionManager, ProfileStore) {
        let gateway = Arc::new(MockStore::new());
        gateway
            .register_account(&derived_identifier("pika"), "pw")
            .await;
        let manager = SessionManager::start(gateway.clone()).await;
        manager.sign_in("pika", "pw").await.unwrap();
        let store = ProfileStore::new(gateway.clone(), manager.clone());
        (gateway, manager, store)
    }

    #[tokio::test]
    async fn test_fetch_and_update() {
        let (gateway, manager, store) = signed_in().await;
        let user = manager.current_user().unwrap();
        gateway
            .insert_row(
                tables::PROFILES,
                Row::new().set("id", user.as_str()).set("username", "Pika"),
            )
            .await
            .unwrap();

        store.fetch().await.unwrap();
        assert_eq!(store.profile().await.unwrap().username, "Pika");

        store
            .update(ProfileChanges {
                username: Some("Captain Pika".to_string()),
                avatar_url: None,
            })
            .await
            .unwrap();
        assert_eq!(store.profile().await.unwrap().username, "Captain Pika");
    }

    #[tokio::test]
    async fn test_missing_profile_forces_sign_out() {
        let (_gateway, manager, store) = signed_in().await;
        assert!(manager.current_user().is_some());

        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, DataError::Integrity(_)));
        assert!(manager.current_user().is_none(), "session must be torn down");
    }

    #[tokio::test]
    async fn test_postcard_count() {
        let (gateway, manager, store) = signed_in().await;
        let user = manager.current_user().unwrap();
        for id in ["p1", "p2"] {
            gateway
                .insert_row(
                    tables::USER_POSTCARDS,
                    Row::new().set("user_id", user.as_str()).set("postcard_id", id),
                )
                .await
                .unwrap();
        }
        assert_eq!(store.postcard_count().await.unwrap(), 2);
    }
}
