//! Data core for the postcard collection app.
//!
//! This crate owns everything between the UI and the remote store
//! gateway: session lifecycle, the per-collection stores with their
//! optimistic-mutation semantics, the exchange record reconciler, and
//! the records/friends merge view-model. It provides:
//!
//! - [`Stores`] - The application-scoped bundle wiring everything together
//! - [`SessionManager`] - Identity lifecycle and sign-in/out
//! - [`PostcardStore`] / [`FriendStore`] / [`ExchangeStore`] / [`ProfileStore`]
//! - [`merge_friend_records`] - The records/friends merge
//! - [`naming`] - Shared name ordering and avatar styling
//!
//! # Architecture
//!
//! ```text
//!                  ┌────────────────────────────────────┐
//!                  │               Stores               │
//!                  │                                    │
//!  session ───────▶│  SessionManager ──identity watch──▶│──▶ every store:
//!  broadcast       │                                    │    clear on sign-out,
//!  (gateway)       │  FriendStore ──identity-changed──▶ │    refetch on sign-in
//!                  │        events (rename / avatar)    │
//!                  │               ▼                    │
//!                  │  PostcardStore + ExchangeStore     │
//!                  │        refetch projections         │
//!                  └────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use postcards::Stores;
//!
//! # async fn example(gateway: Arc<dyn store_core::StoreGateway>) -> Result<(), postcards::DataError> {
//! let stores = Stores::start(gateway).await;
//! stores.session.sign_in("pika", "secret").await?;
//!
//! stores.friends.create("Olimar").await?;
//! for friend in stores.friends.friends().await {
//!     println!("{}", friend.name);
//! }
//! # Ok(())
//! # }
//! ```

mod app;
mod cache;
mod error;
mod exchange;
mod friends;
mod model;
pub mod naming;
mod postcards;
mod profile;
mod records_view;
mod rows;
mod session;
mod tables;

pub use app::Stores;
pub use error::DataError;
pub use exchange::{group_records, ExchangeStore};
pub use friends::{FriendIdentityChanged, FriendStore};
pub use model::{
    encode_sent_to, parse_sent_to, Category, ExchangeDirection, ExchangeRecord, ExchangeStatus,
    Friend, FriendKey, GroupedRecord, Postcard, PostcardSummary, Profile,
};
pub use postcards::{by_category, favorites, search, NewPostcard, PostcardChanges, PostcardStore};
pub use profile::{ProfileChanges, ProfileStore};
pub use records_view::{filter_groups, merge_friend_records, sort_groups_by_name};
pub use session::{derived_identifier, SessionManager, SessionState, HANDLE_SUFFIX};

// Re-export the gateway types consumers need for wiring
pub use store_core::{AuthError, StoreError, StoreGateway, UserId};
