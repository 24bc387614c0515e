//! Domain types.
//!
//! These are the flattened view models the stores cache and the views
//! consume, mapped from the backend's row shapes in `rows`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::naming;

/// Fallback display name for a profile without a username.
pub const UNNAMED_USER: &str = "Unnamed user";

/// Fallback display name for a manually-added friend without a name.
pub const UNNAMED_FRIEND: &str = "Unnamed friend";

/// Default postcard accent color.
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Fixed postcard category tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Mushroom finds.
    Mushroom,
    /// Expedition scenery.
    Adventure,
    /// Petal designs; the legacy "special" flag is a synonym for this tag.
    Petal,
}

impl Category {
    /// Stored string for the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mushroom => "mushroom",
            Category::Adventure => "adventure",
            Category::Petal => "petal",
        }
    }

    /// Parse a stored tag; missing or unknown values fall back to
    /// [`Category::Adventure`] (documented policy, not an error).
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("mushroom") => Category::Mushroom,
            Some("petal") => Category::Petal,
            _ => Category::Adventure,
        }
    }

    /// Whether this tag is the one the legacy `is_special` flag names.
    pub fn is_special(self) -> bool {
        matches!(self, Category::Petal)
    }
}

/// Parse a stored recipient list: split on the delimiter, trim, and drop
/// empty tokens.
pub fn parse_sent_to(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Encode a recipient list for storage; an empty list stores null.
pub fn encode_sent_to(names: &[String]) -> Option<String> {
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

/// A collected postcard: the shared entity joined with the caller's
/// collection relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Postcard {
    /// Shared entity id.
    pub id: String,
    /// Title of the card.
    pub title: String,
    /// Place depicted.
    pub location: String,
    /// Country of the place.
    pub country: String,
    /// Image address.
    pub image_url: String,
    /// Date the caller collected it.
    pub collected: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Accent color.
    pub color: String,
    /// Category tag.
    pub category: Category,
    /// Legacy special flag.
    pub is_special: bool,
    /// Caller's favorite flag (relationship-level).
    pub is_favorite: bool,
    /// Recipient names this card was sent to (relationship-level).
    pub sent_to: Vec<String>,
}

impl Postcard {
    /// Whether the card has been sent to anyone.
    pub fn is_sent(&self) -> bool {
        !self.sent_to.is_empty()
    }
}

/// A contact in the caller's friend list.
///
/// The id identifies the relationship row, never an underlying profile;
/// duplicate display names across relationships are expected.
#[derive(Debug, Clone, PartialEq)]
pub struct Friend {
    /// Relationship row id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stored avatar URL (custom upload or stored placeholder), if any.
    pub avatar_url: Option<String>,
    /// Favorite flag.
    pub is_favorite: bool,
    /// Images of the last few cards sent to this friend. Derived on
    /// read, never stored.
    pub recent_sent: Vec<String>,
}

impl Friend {
    /// Avatar to display: the stored URL, or a placeholder regenerated
    /// from the name.
    pub fn avatar(&self) -> String {
        self.avatar_url
            .clone()
            .unwrap_or_else(|| naming::placeholder_avatar(&self.name))
    }

    /// Whether the avatar is an actual upload.
    pub fn has_custom_avatar(&self) -> bool {
        matches!(&self.avatar_url, Some(url) if naming::is_custom_avatar(url))
    }
}

/// A user profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Account id.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Avatar URL, if set.
    pub avatar_url: Option<String>,
}

/// Direction of an exchange event relative to the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeDirection {
    /// The current user sent the card.
    Sent,
    /// The current user received the card.
    Received,
}

/// Lifecycle status of a formal exchange row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// Sent but not yet delivered.
    Pending,
    /// Delivered to the receiver.
    Delivered,
    /// Claimed into the receiver's collection.
    Claimed,
}

impl ExchangeStatus {
    /// Parse a stored status value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ExchangeStatus::Pending),
            "delivered" => Some(ExchangeStatus::Delivered),
            "claimed" => Some(ExchangeStatus::Claimed),
            _ => None,
        }
    }

    /// Stored string for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Delivered => "delivered",
            ExchangeStatus::Claimed => "claimed",
        }
    }
}

/// Grouping key for a counterpart: a known friend identity, or the raw
/// recipient name for manual annotations that only ever carried a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FriendKey {
    /// Known identity.
    Id(String),
    /// Name-only manual recipient.
    Name(String),
}

/// One exchange event, from either provenance (formal row or manual
/// annotation), normalized into one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRecord {
    /// Unique record id. Manual records use `{relationship_id}-{index}`
    /// so one relationship fanning out to several recipients never
    /// collides.
    pub id: String,
    /// Counterpart key.
    pub friend_key: FriendKey,
    /// Counterpart display name as known at fetch time.
    pub friend_name: String,
    /// Counterpart avatar as known at fetch time.
    pub friend_avatar: String,
    /// Event timestamp.
    pub date: DateTime<Utc>,
    /// Title of the exchanged card.
    pub postcard_title: String,
    /// Image of the exchanged card.
    pub postcard_image_url: String,
    /// Direction relative to the current user.
    pub direction: ExchangeDirection,
    /// Lifecycle status.
    pub status: ExchangeStatus,
}

/// Summary of one card inside a grouped view.
#[derive(Debug, Clone, PartialEq)]
pub struct PostcardSummary {
    /// Record id the summary came from.
    pub id: String,
    /// Card title.
    pub title: String,
    /// Card image.
    pub image_url: String,
    /// Event date.
    pub date: NaiveDate,
}

/// Every sent card grouped under one counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRecord {
    /// Counterpart key.
    pub friend_key: FriendKey,
    /// Counterpart display name.
    pub friend_name: String,
    /// Counterpart avatar.
    pub friend_avatar: String,
    /// Counterpart favorite flag (filled by the merge view).
    pub is_favorite: bool,
    /// Cards sent to this counterpart.
    pub postcards: Vec<PostcardSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_to_roundtrip() {
        assert_eq!(parse_sent_to(Some("Alice, Bob")), vec!["Alice", "Bob"]);
        assert_eq!(parse_sent_to(Some(" Alice ,,  ")), vec!["Alice"]);
        assert!(parse_sent_to(None).is_empty());

        let names = vec!["Alice".to_string(), "Bob".to_string()];
        assert_eq!(encode_sent_to(&names).as_deref(), Some("Alice, Bob"));
        assert_eq!(encode_sent_to(&[]), None);
    }

    #[test]
    fn test_category_fallback() {
        assert_eq!(Category::parse(Some("petal")), Category::Petal);
        assert_eq!(Category::parse(Some("something else")), Category::Adventure);
        assert_eq!(Category::parse(None), Category::Adventure);
        assert!(Category::Petal.is_special());
        assert!(!Category::Mushroom.is_special());
    }

    #[test]
    fn test_friend_avatar_fallback() {
        let friend = Friend {
            id: "f1".to_string(),
            name: "Olimar".to_string(),
            avatar_url: None,
            is_favorite: false,
            recent_sent: Vec::new(),
        };
        assert!(friend.avatar().contains("ui-avatars.com"));
        assert!(!friend.has_custom_avatar());

        let custom = Friend {
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
            ..friend
        };
        assert_eq!(custom.avatar(), "https://cdn.example.com/a.png");
        assert!(custom.has_custom_avatar());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ExchangeStatus::parse("claimed"), Some(ExchangeStatus::Claimed));
        assert_eq!(ExchangeStatus::parse("lost"), None);
    }
}
