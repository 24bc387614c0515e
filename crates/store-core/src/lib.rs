//! Core trait and types for remote store gateway implementations.
//!
//! This crate provides the shared interface between the data layer and
//! whatever backend actually holds the rows. It defines:
//!
//! - [`StoreGateway`] - The trait every backend binding must implement
//! - [`Query`] / [`Filter`] / [`Join`] - A small, backend-agnostic query model
//! - [`Row`] - Loosely-typed row values with typed accessors
//! - [`Session`] / [`UserId`] - Identity types scoping every query
//! - [`AuthError`] / [`StoreError`] - Error taxonomies for auth and data ops
//!
//! # Example
//!
//! ```rust,ignore
//! use store_core::{Query, StoreGateway};
//!
//! async fn titles(gateway: &dyn StoreGateway, user: &str) -> Result<Vec<String>, store_core::StoreError> {
//!     let rows = gateway
//!         .query_rows(Query::table("postcards").eq("user_id", user))
//!         .await?;
//!     rows.iter()
//!         .map(|row| row.str_field("postcards", "title").map(str::to_owned))
//!         .collect()
//! }
//! ```

mod error;
mod gateway;
mod query;
mod row;
mod session;

pub use error::{AuthError, StoreError};
pub use gateway::StoreGateway;
pub use query::{Cond, Filter, Join, Order, Query};
pub use row::Row;
pub use session::{Session, UserId};

// Re-export async_trait for implementors
pub use async_trait::async_trait;
