//! Collection and bucket names.
//!
//! These are an internal contract between the stores and the backend
//! schema, not part of the crate's public interface.

/// Per-user collection relationships.
pub(crate) const USER_POSTCARDS: &str = "user_postcards";

/// Shared postcard entities.
pub(crate) const POSTCARDS: &str = "postcards";

/// Friend relationship rows.
pub(crate) const FRIENDS: &str = "friends";

/// Formal sent/received exchange rows.
pub(crate) const EXCHANGE_RECORDS: &str = "exchange_records";

/// Display name / avatar per account.
pub(crate) const PROFILES: &str = "profiles";

/// Bucket for postcard images.
pub(crate) const POSTCARD_BUCKET: &str = "postcards";

/// Bucket for uploaded friend avatars.
pub(crate) const AVATAR_BUCKET: &str = "friend-avatars";
