//! Tier resolution for progressive disclosure.
//!
//! Given the skills a request may draw on and the categories active in that
//! request, computes the inclusion groups:
//!
//! | Tier | Included when |
//! |------|---------------|
//! | Core | always |
//! | Extended | one of the skill's categories is active |
//! | Library | otherwise (global fallback) |
//!
//! A per-category override replaces the default tier only while that
//! category is active. When several overridden categories are active, the
//! first one in registry order wins. Override keys that are not registered
//! are ignored.

use crate::models::{CategoryRegistry, Skill, Tier, TierGroups};
use std::collections::HashSet;
use std::time::Instant;
use tracing::instrument;

/// Resolves skills into Core, Extended and Library groups.
#[derive(Debug, Clone, Copy)]
pub struct TierResolver<'a> {
    registry: &'a CategoryRegistry,
}

/// Tier groups trimmed to a context budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetedTiers {
    /// Groups that fit the budget.
    pub groups: TierGroups,
    /// Active skills that did not fit.
    pub dropped: usize,
}

impl<'a> TierResolver<'a> {
    /// Creates a resolver that consults `registry` for override precedence.
    #[must_use]
    pub const fn new(registry: &'a CategoryRegistry) -> Self {
        Self { registry }
    }

    /// Computes the tier `skill` takes for a request with `active` categories.
    #[must_use]
    pub fn effective_tier(&self, skill: &Skill, active: &HashSet<String>) -> Tier {
        if skill.tier_overrides.is_empty() {
            return skill.tier;
        }
        self.registry
            .names()
            .filter(|name| active.contains(*name) && skill.categories.iter().any(|c| c == name))
            .find_map(|name| skill.tier_overrides.get(name).copied())
            .unwrap_or(skill.tier)
    }

    /// Buckets active skills by effective tier, preserving input order.
    ///
    /// Every active skill lands in exactly one bucket. Extended-tier skills
    /// with no active category fall through to Library.
    #[must_use]
    #[instrument(
        name = "skillvault.tiers.resolve",
        skip(self, entries, active),
        fields(
            request_id = tracing::field::Empty,
            component = "tiers",
            operation = "resolve",
            entries = entries.len(),
            active_categories = active.len()
        )
    )]
    pub fn resolve(&self, entries: &[Skill], active: &HashSet<String>) -> TierGroups {
        let start = Instant::now();
        let mut groups = TierGroups::default();

        for skill in entries.iter().filter(|s| s.is_active) {
            match self.effective_tier(skill, active) {
                Tier::Core => groups.core.push(skill.clone()),
                Tier::Extended if skill.belongs_to_any(active) => {
                    groups.extended.push(skill.clone());
                },
                Tier::Extended | Tier::Library => groups.library.push(skill.clone()),
            }
        }

        tracing::debug!(
            core = groups.core.len(),
            extended = groups.extended.len(),
            library = groups.library.len(),
            "resolved tiers"
        );
        metrics::counter!("skillvault_operations_total", "operation" => "resolve_tiers", "status" => "success")
            .increment(1);
        metrics::histogram!("skillvault_operation_duration_ms", "operation" => "resolve_tiers")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        groups
    }

    /// Resolves and then keeps at most `max_entries` skills, filling Core
    /// first, then Extended, then Library.
    #[must_use]
    pub fn resolve_with_budget(
        &self,
        entries: &[Skill],
        active: &HashSet<String>,
        max_entries: usize,
    ) -> BudgetedTiers {
        let mut groups = self.resolve(entries, active);
        let total = groups.len();
        let mut remaining = max_entries;

        for bucket in [&mut groups.core, &mut groups.extended, &mut groups.library] {
            bucket.truncate(remaining);
            remaining -= bucket.len();
        }

        BudgetedTiers {
            dropped: total - groups.len(),
            groups,
        }
    }
}
