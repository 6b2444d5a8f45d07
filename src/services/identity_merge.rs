//! Identity-keyed merge primitive.
//!
//! Tags, source URLs and owners are all merged the same way: walk the
//! groups in order and keep the first item seen per identity key.

use std::collections::HashSet;
use std::hash::Hash;

/// Merges `groups` in order, keeping the first item per key.
///
/// # Example
///
/// ```rust
/// use skillvault::services::merge_by_key;
///
/// let target = vec!["x", "Y"];
/// let loser = vec!["Y", "z", "x"];
/// let merged = merge_by_key([target, loser], |s| *s);
/// assert_eq!(merged, vec!["x", "Y", "z"]);
/// ```
pub fn merge_by_key<T, K, G, I, F>(groups: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = G>,
    G: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for item in groups.into_iter().flatten() {
        if seen.insert(key(&item)) {
            merged.push(item);
        }
    }
    merged
}

/// Single-list form of [`merge_by_key`].
pub fn dedupe_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    merge_by_key([items], key)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{Owner, SourceUrl};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_tags_case_sensitive() {
        let merged = merge_by_key(
            [vec!["x".to_string(), "Y".to_string()], vec!["y".to_string(), "x".to_string()]],
            Clone::clone,
        );
        assert_eq!(merged, vec!["x", "Y", "y"]);
    }

    #[test]
    fn test_urls_first_seen_wins() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap();
        let merged = merge_by_key(
            [
                vec![SourceUrl::new("https://a.com/", early)],
                vec![
                    SourceUrl::new("HTTPS://A.COM", late),
                    SourceUrl::new("https://b.com", late),
                ],
            ],
            SourceUrl::normalized_key,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].url, "https://a.com/");
        assert_eq!(merged[0].added_at, early);
    }

    #[test]
    fn test_owners_by_identity() {
        let merged = dedupe_by_key(
            vec![
                Owner::named("Ana").with_user_id("u1"),
                Owner::named("ANA").with_user_id("u1"),
                Owner::named("Bob"),
                Owner::named("bob"),
                Owner::named("Bob"),
            ],
            Owner::identity_key,
        );
        let names: Vec<_> = merged.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bob", "bob"]);
    }

    #[test]
    fn test_empty_groups() {
        let merged: Vec<u8> = merge_by_key(Vec::<Vec<u8>>::new(), |v| *v);
        assert!(merged.is_empty());
    }
}
