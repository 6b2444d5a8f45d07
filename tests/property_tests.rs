//! Property-based tests for tier resolution and identity merging.
//!
//! Uses proptest to verify invariants across random libraries:
//! - Every active skill lands in exactly one tier; inactive skills in none
//! - Tier resolution preserves input order within each bucket
//! - The first active override in registry order wins
//! - Identity dedup is idempotent and keeps first occurrences
//! - Merge target selection picks the longest content

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use skillvault::services::{dedupe_by_key, select_merge_target, truncate_chars};
use skillvault::{CategoryRegistry, Skill, Tier, TierResolver};
use std::collections::{BTreeMap, HashSet};

const CATEGORIES: [&str; 4] = ["billing", "security", "infra", "support"];

fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Core), Just(Tier::Extended), Just(Tier::Library)]
}

fn category_subset() -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(CATEGORIES.to_vec(), 0..=CATEGORIES.len())
        .prop_map(|c| c.into_iter().map(String::from).collect())
}

fn skill(index: usize) -> impl Strategy<Value = Skill> {
    (
        tier(),
        category_subset(),
        proptest::collection::btree_map(proptest::sample::select(CATEGORIES.to_vec()), tier(), 0..3),
        any::<bool>(),
        "[a-z ]{0,40}",
    )
        .prop_map(move |(tier, categories, overrides, active, content)| {
            let mut skill = Skill::new(format!("s{index}"), format!("Skill {index}"), content);
            skill.tier = tier;
            skill.categories = categories;
            skill.tier_overrides = overrides
                .into_iter()
                .map(|(c, t)| (c.to_string(), t))
                .collect::<BTreeMap<_, _>>();
            skill.is_active = active;
            skill
        })
}

fn library() -> impl Strategy<Value = Vec<Skill>> {
    (0usize..12).prop_flat_map(|n| (0..n).map(skill).collect::<Vec<_>>())
}

fn active_set() -> impl Strategy<Value = HashSet<String>> {
    category_subset().prop_map(|c| c.into_iter().collect())
}

fn registry() -> CategoryRegistry {
    CategoryRegistry::from_names(CATEGORIES).expect("valid registry")
}

proptest! {
    /// Property: every active skill appears in exactly one bucket.
    #[test]
    fn prop_tiers_partition_active_skills(skills in library(), active in active_set()) {
        let registry = registry();
        let groups = TierResolver::new(&registry).resolve(&skills, &active);

        let expected: Vec<&str> = skills.iter().filter(|s| s.is_active).map(|s| s.id.as_str()).collect();
        let mut placed: Vec<&str> = groups.iter().map(|(_, s)| s.id.as_str()).collect();
        prop_assert_eq!(placed.len(), expected.len());
        placed.sort_unstable();
        let mut sorted = expected.clone();
        sorted.sort_unstable();
        prop_assert_eq!(placed, sorted);
    }

    /// Property: each bucket keeps the input order.
    #[test]
    fn prop_tiers_preserve_order(skills in library(), active in active_set()) {
        let registry = registry();
        let groups = TierResolver::new(&registry).resolve(&skills, &active);
        let position = |id: &str| skills.iter().position(|s| s.id.as_str() == id).unwrap();

        for tier in Tier::all() {
            let positions: Vec<usize> = groups.bucket(*tier).iter().map(|s| position(s.id.as_str())).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Property: the effective tier is the override of the first registered
    /// category that is active and on the skill, else the default tier.
    #[test]
    fn prop_first_active_override_wins(s in skill(0), active in active_set()) {
        let registry = registry();
        let expected = CATEGORIES
            .iter()
            .find(|c| active.contains(**c) && s.categories.iter().any(|sc| sc == **c) && s.tier_overrides.contains_key(**c))
            .map_or(s.tier, |c| s.tier_overrides[*c]);
        prop_assert_eq!(TierResolver::new(&registry).effective_tier(&s, &active), expected);
    }

    /// Property: budgeted resolution never exceeds the budget and accounts
    /// for every dropped skill.
    #[test]
    fn prop_budget_accounts_for_drops(skills in library(), active in active_set(), budget in 0usize..15) {
        let registry = registry();
        let resolver = TierResolver::new(&registry);
        let full = resolver.resolve(&skills, &active).len();
        let budgeted = resolver.resolve_with_budget(&skills, &active, budget);
        prop_assert!(budgeted.groups.len() <= budget);
        prop_assert_eq!(budgeted.groups.len() + budgeted.dropped, full);
    }

    /// Property: dedup is idempotent and keeps the first occurrence.
    #[test]
    fn prop_dedupe_idempotent(tags in proptest::collection::vec("[a-c]{1,2}", 0..20)) {
        let once = dedupe_by_key(tags.clone(), Clone::clone);
        let twice = dedupe_by_key(once.clone(), Clone::clone);
        prop_assert_eq!(&once, &twice);

        let unique: HashSet<&String> = tags.iter().collect();
        prop_assert_eq!(once.len(), unique.len());
        if let Some(first) = tags.first() {
            prop_assert_eq!(once.first(), Some(first));
        }
    }

    /// Property: the merge target has the longest content; ties go to the
    /// earliest entry.
    #[test]
    fn prop_merge_target_is_longest(contents in proptest::collection::vec("[a-zé]{0,30}", 2..6)) {
        let entries: Vec<Skill> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| Skill::new(format!("m{i}"), format!("M{i}"), c.clone()))
            .collect();
        let longest = contents.iter().map(|c| c.chars().count()).max().unwrap();
        let first_longest = contents.iter().position(|c| c.chars().count() == longest).unwrap();

        let (target, losers) = select_merge_target(entries).unwrap();
        prop_assert_eq!(target.id.as_str(), format!("m{first_longest}"));
        prop_assert_eq!(losers.len(), contents.len() - 1);
    }

    /// Property: previews never exceed the character limit.
    #[test]
    fn prop_truncate_respects_limit(s in "\\PC{0,80}", max in 0usize..50) {
        let truncated = truncate_chars(&s, max);
        prop_assert!(truncated.chars().count() <= max);
        prop_assert!(s.starts_with(&truncated));
    }
}
