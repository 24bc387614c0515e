//! In-memory store gateway for tests and local development.
//!
//! This crate provides [`MockStore`], an implementation of the
//! [`StoreGateway`](store_core::StoreGateway) trait backed by in-process
//! tables. It supports:
//!
//! - Filter, join, order, and limit evaluation over seeded rows
//! - A toy account registry with confirmation and rate-limit switches
//! - Failure injection for exercising optimistic-rollback paths
//! - A blob bucket with deterministic public URLs
//!
//! For the hosted backend, use the `rest-store` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_store::MockStore;
//! use store_core::{Query, Row, StoreGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MockStore::new();
//! store.register_account("pika@postbox.invalid", "secret").await;
//! let session = store.sign_in("pika@postbox.invalid", "secret").await?;
//!
//! store
//!     .insert_row("friends", Row::new().set("user_id", session.user_id.as_str()).set("friend_name", "Olimar"))
//!     .await?;
//!
//! let rows = store
//!     .query_rows(Query::table("friends").eq("user_id", session.user_id.as_str()))
//!     .await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::MockStore;

// Re-export store-core types for convenience
pub use store_core::{AuthError, Filter, Join, Query, Row, Session, StoreError, StoreGateway, UserId};
