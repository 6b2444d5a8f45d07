//! Category maintenance.
//!
//! Skills reference categories by name, so renaming or removing a category
//! rekeys every skill that mentions it: its category list and any tier
//! override keyed by the old name. Skills are updated one at a time with the
//! same per-item accounting as bulk operations.

use super::bulk::{BulkFailure, BulkOutcome};
use super::event_meta;
use crate::models::{
    ActingUser, CategoryRegistry, EntryEvent, HistoryAction, HistoryEntry, Skill, SkillPatch,
};
use crate::observability::record_event;
use crate::storage::EntryStore;
use crate::Result;
use chrono::Utc;
use tracing::instrument;

/// Renames and removes categories, keeping skills consistent.
pub struct CategoryService<S: EntryStore> {
    store: S,
}

impl<S: EntryStore> CategoryService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Renames `old` to `new` in the registry and rekeys every skill.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if `old` is unknown,
    /// [`crate::Error::InvalidInput`] if `new` is empty or taken, or the store
    /// error if skills cannot be listed. Per-skill failures are reported in
    /// the outcome.
    #[instrument(
        name = "skillvault.categories.rename",
        skip(self, registry, actor),
        fields(request_id = tracing::field::Empty, component = "categories", operation = "rename")
    )]
    pub fn rename(
        &self,
        registry: &mut CategoryRegistry,
        old: &str,
        new: &str,
        actor: &ActingUser,
    ) -> Result<BulkOutcome> {
        let skills = self.store.list()?;
        registry.rename(old, new)?;
        let outcome = self.rekey(skills, old, Some(new), actor);
        record_event(EntryEvent::CategoryRenamed {
            meta: event_meta("categories", actor),
            old_name: old.to_string(),
            new_name: Some(new.to_string()),
            affected: outcome.succeeded.len(),
        });
        Ok(outcome)
    }

    /// Removes `name` from the registry and strips it from every skill.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the category is unknown, or the
    /// store error if skills cannot be listed.
    #[instrument(
        name = "skillvault.categories.remove",
        skip(self, registry, actor),
        fields(request_id = tracing::field::Empty, component = "categories", operation = "remove")
    )]
    pub fn remove(
        &self,
        registry: &mut CategoryRegistry,
        name: &str,
        actor: &ActingUser,
    ) -> Result<BulkOutcome> {
        let skills = self.store.list()?;
        registry.remove(name)?;
        let outcome = self.rekey(skills, name, None, actor);
        record_event(EntryEvent::CategoryRenamed {
            meta: event_meta("categories", actor),
            old_name: name.to_string(),
            new_name: None,
            affected: outcome.succeeded.len(),
        });
        Ok(outcome)
    }

    fn rekey(
        &self,
        skills: Vec<Skill>,
        old: &str,
        new: Option<&str>,
        actor: &ActingUser,
    ) -> BulkOutcome {
        let operation = if new.is_some() {
            "rename_category"
        } else {
            "remove_category"
        };
        let mut outcome = BulkOutcome::new(operation);
        let summary = new.map_or_else(
            || format!("Category '{old}' removed"),
            |new| format!("Category '{old}' renamed to '{new}'"),
        );

        for skill in skills.into_iter().filter(|s| references(s, old)) {
            outcome.attempted += 1;
            let patch = rekey_patch(&skill, old, new, &summary, actor);
            match self.store.update(&skill.id, &patch) {
                Ok(updated) => {
                    record_event(EntryEvent::Updated {
                        meta: event_meta("categories", actor),
                        skill_id: updated.id.clone(),
                        modified_fields: patch
                            .modified_fields()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    });
                    outcome.succeeded.push(updated);
                },
                Err(e) => {
                    tracing::warn!(skill_id = %skill.id, error = %e, "failed to rekey category");
                    outcome.failed.push(BulkFailure {
                        skill,
                        error: e.to_string(),
                    });
                },
            }
        }
        tracing::info!(
            old,
            new,
            rekeyed = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "category rekeyed"
        );
        outcome
    }
}

fn references(skill: &Skill, category: &str) -> bool {
    skill.categories.iter().any(|c| c == category) || skill.tier_overrides.contains_key(category)
}

fn rekey_patch(
    skill: &Skill,
    old: &str,
    new: Option<&str>,
    summary: &str,
    actor: &ActingUser,
) -> SkillPatch {
    let mut categories = Vec::with_capacity(skill.categories.len());
    for category in &skill.categories {
        let renamed = if category == old { new } else { Some(category.as_str()) };
        match renamed {
            Some(name) if !categories.iter().any(|c: &String| c == name) => {
                categories.push(name.to_string());
            },
            _ => {},
        }
    }

    let mut overrides = skill.tier_overrides.clone();
    if let (Some(tier), Some(new)) = (overrides.remove(old), new) {
        overrides.entry(new.to_string()).or_insert(tier);
    }

    SkillPatch {
        categories: Some(categories),
        tier_overrides: Some(overrides),
        history_append: vec![
            HistoryEntry::new(HistoryAction::CategoryRenamed, summary, Utc::now()).by(actor),
        ],
        ..SkillPatch::default()
    }
}
