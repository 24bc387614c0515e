//! The application-scoped store bundle.
//!
//! One [`Stores`] value owns the session manager and every store, wired
//! together: each store follows identity changes (clearing on sign-out,
//! refetching on sign-in), and the postcard store and exchange
//! reconciler follow the friend store's identity-changed events. The
//! bundle is passed by reference to every consumer; there is no ambient
//! global state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use store_core::StoreGateway;

use crate::exchange::ExchangeStore;
use crate::friends::FriendStore;
use crate::postcards::PostcardStore;
use crate::profile::ProfileStore;
use crate::session::{SessionManager, SessionState};

/// Every store, wired and ready.
///
/// Dropping the bundle stops the background subscriptions.
pub struct Stores {
    /// Session lifecycle and sign-in/out.
    pub session: SessionManager,
    /// Collected postcards.
    pub postcards: Arc<PostcardStore>,
    /// Friend list.
    pub friends: Arc<FriendStore>,
    /// Exchange records.
    pub exchange: Arc<ExchangeStore>,
    /// Own profile.
    pub profile: Arc<ProfileStore>,
    tasks: Vec<JoinHandle<()>>,
}

impl Stores {
    /// Build and wire every store over one gateway.
    pub async fn start(gateway: Arc<dyn StoreGateway>) -> Self {
        let session = SessionManager::start(gateway.clone()).await;

        let friends = Arc::new(FriendStore::new(gateway.clone(), session.subscribe()));
        let postcards = Arc::new(PostcardStore::new(
            gateway.clone(),
            session.subscribe(),
            friends.cache_handle(),
        ));
        let exchange = Arc::new(ExchangeStore::new(gateway.clone(), session.subscribe()));
        let profile = Arc::new(ProfileStore::new(gateway, session.clone()));

        let mut tasks = Vec::new();

        // Identity changes: clear on sign-out, refetch on sign-in.
        {
            let store = postcards.clone();
            let mut rx = session.subscribe();
            tasks.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    store.apply_session(&state).await;
                }
            }));
        }
        {
            let store = friends.clone();
            let mut rx = session.subscribe();
            tasks.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    store.apply_session(&state).await;
                }
            }));
        }
        {
            let store = exchange.clone();
            let mut rx = session.subscribe();
            tasks.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    store.apply_session(&state).await;
                }
            }));
        }
        {
            let store = profile.clone();
            let mut rx = session.subscribe();
            tasks.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    store.apply_session(&state).await;
                }
            }));
        }

        // A friend's display identity is denormalized into the other
        // collections' read projections; refetch them after a rename or
        // avatar change.
        {
            let postcards = postcards.clone();
            let exchange = exchange.clone();
            let mut events = friends.subscribe_identity_changes();
            tasks.push(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(_changed) => {
                            if let Err(err) = postcards.fetch().await {
                                warn!("postcard refresh after friend change failed: {}", err);
                            }
                            if let Err(err) = exchange.fetch().await {
                                warn!("exchange refresh after friend change failed: {}", err);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        let stores = Self {
            session,
            postcards,
            friends,
            exchange,
            profile,
            tasks,
        };

        if stores.session.current_user().is_some() {
            stores.refresh().await;
        }
        stores
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Fetch the three collections; read failures are recorded on the
    /// stores (and logged), not returned.
    pub async fn refresh(&self) {
        if let Err(err) = self.friends.fetch().await {
            warn!("friend fetch failed: {}", err);
        }
        if let Err(err) = self.postcards.fetch().await {
            warn!("postcard fetch failed: {}", err);
        }
        if let Err(err) = self.exchange.fetch().await {
            warn!("exchange fetch failed: {}", err);
        }
    }
}

impl Drop for Stores {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
