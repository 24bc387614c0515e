//! Display-name ordering and deterministic avatar styling.
//!
//! Every view that lists friend or recipient names uses the same
//! comparator and the same color assignment, so orderings and colors stay
//! consistent across screens.

use std::cmp::Ordering;

/// Ten high-contrast avatar background colors.
pub const AVATAR_PALETTE: [&str; 10] = [
    "#0ea5e9", // sky
    "#f43f5e", // rose
    "#10b981", // emerald
    "#f59e0b", // amber
    "#8b5cf6", // violet
    "#f97316", // orange
    "#14b8a6", // teal
    "#ec4899", // pink
    "#84cc16", // lime
    "#6366f1", // indigo
];

/// Domains whose avatar URLs are generated placeholders, not uploads.
const PLACEHOLDER_DOMAINS: [&str; 2] = ["ui-avatars.com", "placeholder"];

/// First-character tier: ideographs sort before Latin, Latin before the
/// rest.
fn char_tier(c: char) -> u8 {
    if ('\u{4e00}'..='\u{9fff}').contains(&c) {
        0
    } else if c.is_ascii_alphabetic() {
        1
    } else {
        2
    }
}

/// Total order over display names: tier of the first character, then
/// case-folded lexicographic order within the tier.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let tier_a = a.chars().next().map(char_tier).unwrap_or(2);
    let tier_b = b.chars().next().map(char_tier).unwrap_or(2);
    tier_a
        .cmp(&tier_b)
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Deterministic avatar color for a name.
///
/// When the name is known to be duplicated across relationships, the hash
/// input is name + relationship id, so two friends sharing a name render
/// differently while one friend's color stays stable across renders.
pub fn avatar_color(name: &str, relationship_id: &str, name_is_duplicated: bool) -> &'static str {
    let source = if name_is_duplicated {
        format!("{}{}", name, relationship_id)
    } else {
        name.to_string()
    };
    let mut hash: i32 = 0;
    for unit in source.encode_utf16() {
        hash = (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    AVATAR_PALETTE[(hash.unsigned_abs() as usize) % AVATAR_PALETTE.len()]
}

/// Names appearing on more than one friend relationship.
pub fn duplicated_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// First two characters of a name, uppercased.
pub fn initials(name: &str) -> String {
    name.chars().take(2).flat_map(char::to_uppercase).collect()
}

/// Deterministic generated-avatar URL for a name.
pub fn placeholder_avatar(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=7dd3fc&color=fff&bold=true",
        urlencoding::encode(name)
    )
}

/// Whether an avatar URL is an actual upload rather than a generated
/// placeholder.
pub fn is_custom_avatar(url: &str) -> bool {
    !url.is_empty() && !PLACEHOLDER_DOMAINS.iter().any(|domain| url.contains(domain))
}
