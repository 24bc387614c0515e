//! Row shapes per query, and their mappings into domain types.
//!
//! One struct per query result shape. Required fields that are absent
//! fail the decode with a typed error naming the collection; the only
//! silent defaults are the documented policies (category fallback,
//! default color, false-y flags).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::model::{
    parse_sent_to, Category, Friend, Postcard, Profile, DEFAULT_COLOR, UNNAMED_FRIEND,
    UNNAMED_USER,
};
use crate::naming;

/// A collection relationship joined with its postcard entity.
#[derive(Debug, Deserialize)]
pub(crate) struct CollectedRow {
    #[allow(dead_code)]
    pub id: String,
    pub collected_date: NaiveDate,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub sent_to: Option<String>,
    pub postcard: PostcardEntityRow,
}

/// The shared postcard entity.
#[derive(Debug, Deserialize)]
pub(crate) struct PostcardEntityRow {
    pub id: String,
    pub title: String,
    pub location: String,
    pub country: String,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_special: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
}

impl CollectedRow {
    /// Flatten into the cached view model.
    pub fn into_postcard(self) -> Postcard {
        let entity = self.postcard;
        Postcard {
            id: entity.id,
            title: entity.title,
            location: entity.location,
            country: entity.country,
            image_url: entity.image_url,
            collected: self.collected_date,
            description: entity.description.unwrap_or_default(),
            color: entity.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            category: Category::parse(entity.category.as_deref()),
            is_special: entity.is_special.unwrap_or(false),
            is_favorite: self.is_favorite.unwrap_or(false),
            sent_to: parse_sent_to(self.sent_to.as_deref()),
        }
    }
}

/// A friend relationship with its optional backing profile.
#[derive(Debug, Deserialize)]
pub(crate) struct FriendRow {
    pub id: String,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub friend_name: Option<String>,
    #[serde(default)]
    pub friend_avatar: Option<String>,
    #[serde(default)]
    pub profile: Option<ProfileRow>,
}

impl FriendRow {
    /// Map into the domain type.
    ///
    /// A backing profile wins over the manually-entered fields; either
    /// way the id stays the relationship row's id.
    pub fn into_friend(self) -> Friend {
        let (name, avatar_url) = match self.profile {
            Some(profile) => (
                profile.username.unwrap_or_else(|| UNNAMED_USER.to_string()),
                profile.avatar,
            ),
            None => (
                self.friend_name
                    .unwrap_or_else(|| UNNAMED_FRIEND.to_string()),
                self.friend_avatar,
            ),
        };
        Friend {
            id: self.id,
            name,
            avatar_url,
            is_favorite: self.is_favorite.unwrap_or(false),
            recent_sent: Vec::new(),
        }
    }
}

/// A profile row.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ProfileRow {
    /// Map into the domain type.
    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            username: self.username.unwrap_or_else(|| UNNAMED_USER.to_string()),
            avatar_url: self.avatar,
        }
    }

    /// Display name and avatar as an exchange counterpart.
    pub fn display_identity(&self) -> (String, String) {
        let name = self
            .username
            .clone()
            .unwrap_or_else(|| UNNAMED_USER.to_string());
        let avatar = self
            .avatar
            .clone()
            .unwrap_or_else(|| naming::placeholder_avatar(&name));
        (name, avatar)
    }
}

/// Title and image of a card referenced by an exchange row.
#[derive(Debug, Deserialize)]
pub(crate) struct CardSummaryRow {
    pub title: String,
    pub image_url: String,
}

/// A formal exchange row with its card and both profiles embedded.
#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sent_date: DateTime<Utc>,
    pub status: String,
    pub postcard: CardSummaryRow,
    pub sender: ProfileRow,
    pub receiver: ProfileRow,
}

/// A collection relationship carrying a manual recipient annotation.
#[derive(Debug, Deserialize)]
pub(crate) struct ManualRow {
    pub id: String,
    #[serde(default)]
    pub sent_to: Option<String>,
    pub collected_date: NaiveDate,
    pub postcard: CardSummaryRow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::Row;

    #[test]
    fn test_collected_row_defaults() {
        let row = Row::new()
            .set("id", "rel-1")
            .set("collected_date", "2024-01-05")
            .set_null("is_favorite")
            .set("postcard", serde_json::json!({
                "id": "p1",
                "title": "Reef",
                "location": "Okinawa",
                "country": "Japan",
                "image_url": "https://img/x.png"
            }));
        let decoded: CollectedRow = row.decode("user_postcards").unwrap();
        let card = decoded.into_postcard();
        assert_eq!(card.id, "p1");
        assert_eq!(card.color, DEFAULT_COLOR);
        assert_eq!(card.category, Category::Adventure);
        assert!(!card.is_favorite);
        assert!(card.sent_to.is_empty());
    }

    #[test]
    fn test_collected_row_missing_entity_field_fails() {
        let row = Row::new()
            .set("id", "rel-1")
            .set("collected_date", "2024-01-05")
            .set("postcard", serde_json::json!({ "id": "p1", "title": "Reef" }));
        assert!(row.decode::<CollectedRow>("user_postcards").is_err());
    }

    #[test]
    fn test_friend_row_prefers_profile() {
        let row = Row::new()
            .set("id", "rel-1")
            .set("friend_name", "typed name")
            .set("profile", serde_json::json!({
                "id": "acct-1",
                "username": "Louie",
                "avatar": "https://cdn.example.com/l.png"
            }));
        let friend = row.decode::<FriendRow>("friends").unwrap().into_friend();
        assert_eq!(friend.id, "rel-1");
        assert_eq!(friend.name, "Louie");
        assert_eq!(friend.avatar_url.as_deref(), Some("https://cdn.example.com/l.png"));
    }

    #[test]
    fn test_friend_row_manual_fallbacks() {
        let row = Row::new().set("id", "rel-2").set_null("profile");
        let friend = row.decode::<FriendRow>("friends").unwrap().into_friend();
        assert_eq!(friend.name, UNNAMED_FRIEND);
        assert!(friend.avatar_url.is_none());
    }
}
