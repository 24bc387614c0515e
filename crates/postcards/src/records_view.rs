//! The records/friends merge view-model.
//!
//! Guarantees every current friend appears in the records view exactly
//! once - including friends with zero exchanges - and that identity
//! fields always reflect the friend store's current truth rather than
//! the possibly-stale denormalized copies inside exchange records.

use std::collections::HashMap;

use crate::model::{Friend, FriendKey, GroupedRecord};
use crate::naming;

/// Merge the friend list with the reconciler's grouped output.
///
/// Each friend is matched by id first, then by display name (the name
/// path catches manual-provenance groups that only ever carried a name).
/// Matched groups keep their postcards, re-sorted with the shared name
/// comparator on the title, but take the friend's current id, name,
/// avatar, and favorite flag. Unmatched friends get an empty group.
/// Groups referencing someone absent from the friend list are dropped.
pub fn merge_friend_records(friends: &[Friend], groups: &[GroupedRecord]) -> Vec<GroupedRecord> {
    let mut by_id: HashMap<&str, &GroupedRecord> = HashMap::new();
    let mut by_name: HashMap<&str, &GroupedRecord> = HashMap::new();
    for group in groups {
        if let FriendKey::Id(id) = &group.friend_key {
            by_id.insert(id.as_str(), group);
        }
        by_name.insert(group.friend_name.as_str(), group);
    }

    friends
        .iter()
        .map(|friend| {
            let matched = by_id
                .get(friend.id.as_str())
                .or_else(|| by_name.get(friend.name.as_str()));
            let postcards = match matched {
                Some(group) => {
                    let mut postcards = group.postcards.clone();
                    postcards.sort_by(|a, b| naming::compare_names(&a.title, &b.title));
                    postcards
                }
                None => Vec::new(),
            };
            GroupedRecord {
                friend_key: FriendKey::Id(friend.id.clone()),
                friend_name: friend.name.clone(),
                friend_avatar: friend.avatar(),
                is_favorite: friend.is_favorite,
                postcards,
            }
        })
        .collect()
}

/// Sort merged groups by friend name with the shared comparator.
pub fn sort_groups_by_name(groups: &mut [GroupedRecord]) {
    groups.sort_by(|a, b| naming::compare_names(&a.friend_name, &b.friend_name));
}

/// Filter merged groups by a name search term and an optional
/// favorites-only tab.
pub fn filter_groups<'a>(
    groups: &'a [GroupedRecord],
    term: &str,
    favorites_only: bool,
) -> Vec<&'a GroupedRecord> {
    let needle = term.trim().to_lowercase();
    groups
        .iter()
        .filter(|group| !favorites_only || group.is_favorite)
        .filter(|group| needle.is_empty() || group.friend_name.to_lowercase().contains(&needle))
        .collect()
}
