//! HTTP gateway to a hosted PostgREST-shaped backend.
//!
//! This crate binds the [`StoreGateway`](store_core::StoreGateway) trait to
//! the hosted backend the application actually runs on: a REST data API,
//! a token-based auth endpoint, and an object storage endpoint under one
//! base URL. It supports:
//!
//! - Query translation into PostgREST query strings (filters, embedded
//!   joins, ordering, limits)
//! - Bearer-token session handling with optional recovery from a
//!   persisted refresh token
//! - Classification of auth failures into the shared [`AuthError`] kinds
//! - Binary uploads and public URL derivation for stored objects
//!
//! # Example
//!
//! ```no_run
//! use rest_store::{RestConfig, RestStore};
//! use store_core::{Query, StoreGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RestConfig::new("https://project.example.co", "anon-key");
//! let store = RestStore::connect(config).await?;
//!
//! let session = store.sign_in("pika@postbox.invalid", "secret").await?;
//! let rows = store
//!     .query_rows(Query::table("user_postcards").eq("user_id", session.user_id.as_str()))
//!     .await?;
//! println!("{} postcards", rows.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod postgrest;

pub use client::RestStore;
pub use config::{PersistedSession, RestConfig};

// Re-export store-core types for convenience
pub use store_core::{AuthError, Filter, Join, Query, Row, Session, StoreError, StoreGateway, UserId};
