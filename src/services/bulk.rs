//! Bulk operations over a multi-selected set of skills.
//!
//! Entries the actor may not edit are excluded before anything runs and
//! are not counted as failures. The rest are processed strictly one at a
//! time; a failure on one entry never stops the run.

use super::event_meta;
use super::identity_merge::dedupe_by_key;
use super::refresh::SourceRefresher;
use crate::models::{
    ActingUser, EntryEvent, HistoryAction, HistoryEntry, Owner, OwnerKey, Skill, SkillPatch,
};
use crate::observability::{current_correlation_id, record_event};
use crate::security::filter_editable;
use crate::storage::EntryStore;
use crate::{Error, Result};
use chrono::Utc;
use std::fmt;
use std::time::Instant;
use tracing::instrument;

/// An operation applied to every selected skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOperation {
    /// Adds an owner; skills that already have it are skipped.
    AssignOwner(Owner),
    /// Removes the owner with this identity; skills without it are skipped.
    RemoveOwner(OwnerKey),
    /// Regenerates content from source URLs; skills without any are excluded.
    RefreshFromSource,
}

impl BulkOperation {
    /// Stable name for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AssignOwner(_) => "assign_owner",
            Self::RemoveOwner(_) => "remove_owner",
            Self::RefreshFromSource => "refresh_from_source",
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A skill whose operation failed.
#[derive(Debug, Clone)]
pub struct BulkFailure {
    /// The skill as it was before the attempt.
    pub skill: Skill,
    /// Error message.
    pub error: String,
}

/// Per-item accounting for a bulk run.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Operation name.
    pub operation: &'static str,
    /// Entries the actor may not edit. Never attempted.
    pub excluded_unauthorized: usize,
    /// Entries the operation does not apply to (e.g. no source URLs). Never
    /// attempted.
    pub excluded_ineligible: usize,
    /// Entries processed: succeeded + failed + skipped.
    pub attempted: usize,
    /// Updated skills, as persisted.
    pub succeeded: Vec<Skill>,
    /// Failures, in processing order.
    pub failed: Vec<BulkFailure>,
    /// Entries left unchanged because the operation was a no-op for them.
    pub skipped: Vec<Skill>,
}

impl BulkOutcome {
    /// Creates an empty outcome for `operation`.
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            ..Self::default()
        }
    }

    /// True when nothing could be attempted because every entry was excluded.
    #[must_use]
    pub const fn nothing_editable(&self) -> bool {
        self.attempted == 0
    }

    /// Returns true if every attempted entry succeeded or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns a human-readable summary, e.g. `"4 succeeded, 1 failed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.nothing_editable() {
            let mut summary = "Nothing to do".to_string();
            if self.excluded_unauthorized > 0 {
                summary.push_str(&format!(
                    ": {} not editable by you",
                    self.excluded_unauthorized
                ));
            }
            if self.excluded_ineligible > 0 {
                summary.push_str(&format!(
                    "{} {} not eligible",
                    if self.excluded_unauthorized > 0 { "," } else { ":" },
                    self.excluded_ineligible
                ));
            }
            return summary;
        }

        let mut summary = format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        );
        if !self.skipped.is_empty() {
            summary.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        let excluded = self.excluded_unauthorized + self.excluded_ineligible;
        if excluded > 0 {
            summary.push_str(&format!(" ({excluded} excluded)"));
        }
        summary
    }
}

enum ItemResult {
    Updated(Skill, EntryEvent),
    Skipped,
}

/// Runs bulk operations against an entry store.
pub struct BulkRunner<S: EntryStore> {
    store: S,
}

impl<S: EntryStore> BulkRunner<S> {
    /// Creates a runner.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Applies `op` to `entries` sequentially on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] before any side effect when the
    /// operation is malformed or a refresh is requested without a
    /// refresher. Per-item failures are reported in the outcome instead.
    #[instrument(
        name = "skillvault.bulk.run",
        skip(self, entries, actor, refresher),
        fields(
            request_id = tracing::field::Empty,
            component = "bulk",
            operation = op.name(),
            selected = entries.len()
        )
    )]
    pub fn run(
        &self,
        entries: Vec<Skill>,
        op: &BulkOperation,
        actor: &ActingUser,
        refresher: Option<&dyn SourceRefresher>,
    ) -> Result<BulkOutcome> {
        let start = Instant::now();
        if let Some(id) = current_correlation_id() {
            tracing::Span::current().record("request_id", id.as_str());
        }
        validate(op, refresher)?;

        let mut outcome = BulkOutcome::new(op.name());
        let (editable, excluded) = filter_editable(entries, actor);
        outcome.excluded_unauthorized = excluded;

        let eligible: Vec<Skill> = match op {
            BulkOperation::RefreshFromSource => {
                let (eligible, ineligible): (Vec<_>, Vec<_>) =
                    editable.into_iter().partition(|s| !s.source_urls.is_empty());
                outcome.excluded_ineligible = ineligible.len();
                eligible
            },
            BulkOperation::AssignOwner(_) | BulkOperation::RemoveOwner(_) => editable,
        };

        for skill in eligible {
            outcome.attempted += 1;
            match self.apply_one(&skill, op, actor, refresher) {
                Ok(ItemResult::Updated(updated, event)) => {
                    record_event(event);
                    outcome.succeeded.push(updated);
                },
                Ok(ItemResult::Skipped) => {
                    tracing::debug!(skill_id = %skill.id, "bulk operation is a no-op, skipped");
                    outcome.skipped.push(skill);
                },
                Err(e) => {
                    tracing::warn!(skill_id = %skill.id, error = %e, "bulk operation failed for entry");
                    outcome.failed.push(BulkFailure {
                        skill,
                        error: e.to_string(),
                    });
                },
            }
        }

        tracing::info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            excluded_unauthorized = outcome.excluded_unauthorized,
            excluded_ineligible = outcome.excluded_ineligible,
            "bulk run finished"
        );
        let status = if outcome.is_success() { "success" } else { "partial" };
        metrics::counter!("skillvault_operations_total", "operation" => op.name(), "status" => status)
            .increment(1);
        metrics::counter!("skillvault_bulk_items_total", "operation" => op.name(), "status" => "failed")
            .increment(outcome.failed.len() as u64);
        metrics::histogram!("skillvault_operation_duration_ms", "operation" => op.name())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(outcome)
    }

    fn apply_one(
        &self,
        skill: &Skill,
        op: &BulkOperation,
        actor: &ActingUser,
        refresher: Option<&dyn SourceRefresher>,
    ) -> Result<ItemResult> {
        let now = Utc::now();
        match op {
            BulkOperation::AssignOwner(owner) => {
                let key = owner.identity_key();
                if skill.has_owner(&key) {
                    return Ok(ItemResult::Skipped);
                }
                let owners = dedupe_by_key(
                    skill.owners.iter().cloned().chain(std::iter::once(owner.clone())),
                    Owner::identity_key,
                );
                let patch = SkillPatch {
                    owners: Some(owners),
                    history_append: vec![
                        HistoryEntry::new(
                            HistoryAction::OwnerAdded,
                            format!("Added owner {}", owner.name),
                            now,
                        )
                        .by(actor),
                    ],
                    ..SkillPatch::default()
                };
                let updated = self.store.update(&skill.id, &patch)?;
                let event = EntryEvent::OwnerAdded {
                    meta: event_meta("bulk", actor),
                    skill_id: skill.id.clone(),
                    owner: key,
                };
                Ok(ItemResult::Updated(updated, event))
            },
            BulkOperation::RemoveOwner(key) => {
                let Some(removed) = skill.owners.iter().find(|o| &o.identity_key() == key) else {
                    return Ok(ItemResult::Skipped);
                };
                let owners = skill
                    .owners
                    .iter()
                    .filter(|o| &o.identity_key() != key)
                    .cloned()
                    .collect();
                let patch = SkillPatch {
                    owners: Some(owners),
                    history_append: vec![
                        HistoryEntry::new(
                            HistoryAction::OwnerRemoved,
                            format!("Removed owner {}", removed.name),
                            now,
                        )
                        .by(actor),
                    ],
                    ..SkillPatch::default()
                };
                let updated = self.store.update(&skill.id, &patch)?;
                let event = EntryEvent::OwnerRemoved {
                    meta: event_meta("bulk", actor),
                    skill_id: skill.id.clone(),
                    owner: key.clone(),
                };
                Ok(ItemResult::Updated(updated, event))
            },
            BulkOperation::RefreshFromSource => {
                let refresher = refresher.ok_or_else(missing_refresher)?;
                let refreshed = refresher.refresh_from_source(skill)?;
                let mut source_urls = refreshed.source_urls;
                for url in &mut source_urls {
                    url.last_fetched_at.get_or_insert(now);
                }
                let sources = source_urls.len();
                let patch = SkillPatch {
                    title: Some(refreshed.title),
                    content: Some(refreshed.content),
                    tags: Some(dedupe_by_key(refreshed.tags, Clone::clone)),
                    source_urls: Some(source_urls),
                    history_append: vec![
                        HistoryEntry::new(
                            HistoryAction::Refreshed,
                            format!("Refreshed from {sources} source(s) via {}", refresher.name()),
                            now,
                        )
                        .by(actor),
                    ],
                    ..SkillPatch::default()
                };
                let updated = self.store.update(&skill.id, &patch)?;
                let event = EntryEvent::Refreshed {
                    meta: event_meta("bulk", actor),
                    skill_id: skill.id.clone(),
                    sources,
                };
                Ok(ItemResult::Updated(updated, event))
            },
        }
    }
}

fn validate(op: &BulkOperation, refresher: Option<&dyn SourceRefresher>) -> Result<()> {
    match op {
        BulkOperation::AssignOwner(owner)
            if owner.name.trim().is_empty() && owner.user_id.is_none() =>
        {
            Err(Error::InvalidInput(
                "owner needs a name or a user id".to_string(),
            ))
        },
        BulkOperation::RefreshFromSource if refresher.is_none() => Err(missing_refresher()),
        _ => Ok(()),
    }
}

fn missing_refresher() -> Error {
    Error::InvalidInput("refresh requested without a source refresher".to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::SourceUrl;
    use crate::storage::InMemoryEntryStore;

    struct UppercaseRefresher;

    impl SourceRefresher for UppercaseRefresher {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn refresh_from_source(&self, skill: &Skill) -> Result<Skill> {
            if skill.title == "broken" {
                return Err(Error::Collaborator {
                    collaborator: "uppercase",
                    cause: "fetch failed".to_string(),
                });
            }
            let mut refreshed = skill.clone();
            refreshed.content = skill.content.to_uppercase();
            Ok(refreshed)
        }
    }

    fn with_source(id: &str, title: &str) -> Skill {
        let mut skill = Skill::new(id, title, "body");
        skill.source_urls = vec![SourceUrl::new("https://docs.example.com", Utc::now())];
        skill
    }

    #[test]
    fn test_assign_owner_skips_existing() {
        let mut owned = Skill::new("a", "A", "");
        owned.owners = vec![Owner::named("Ana").with_user_id("u1")];
        let free = Skill::new("b", "B", "");
        let store = InMemoryEntryStore::with_skills(vec![owned.clone(), free.clone()]);
        let runner = BulkRunner::new(store);

        let outcome = runner.run(
            vec![owned, free],
            &BulkOperation::AssignOwner(Owner::named("ANA").with_user_id("u1")),
            &ActingUser::with_id("u1"),
            None,
        );
        let outcome = outcome.unwrap();
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.summary(), "1 succeeded, 0 failed, 1 skipped");

        let stored = runner.store().require(&"b".into()).unwrap();
        assert_eq!(
            stored.history.last().map(|h| h.action.clone()),
            Some(HistoryAction::OwnerAdded)
        );
    }

    #[test]
    fn test_unauthorized_excluded_not_failed() {
        let mut theirs = Skill::new("a", "A", "");
        theirs.owners = vec![Owner::named("Other").with_user_id("u9")];
        let runner = BulkRunner::new(InMemoryEntryStore::with_skills(vec![theirs.clone()]));

        let outcome = runner.run(
            vec![theirs],
            &BulkOperation::AssignOwner(Owner::named("Me").with_user_id("u1")),
            &ActingUser::with_id("u1"),
            None,
        );
        let outcome = outcome.unwrap();
        assert!(outcome.nothing_editable());
        assert_eq!(outcome.excluded_unauthorized, 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.summary(), "Nothing to do: 1 not editable by you");
    }

    #[test]
    fn test_remove_owner() {
        let mut owned = Skill::new("a", "A", "");
        owned.owners = vec![Owner::named("Ana").with_user_id("u1"), Owner::named("Bob")];
        let unowned_by_bob = Skill::new("b", "B", "");
        let runner = BulkRunner::new(InMemoryEntryStore::with_skills(vec![
            owned.clone(),
            unowned_by_bob.clone(),
        ]));

        let outcome = runner.run(
            vec![owned, unowned_by_bob],
            &BulkOperation::RemoveOwner(OwnerKey::Name("Bob".to_string())),
            &ActingUser::with_id("u1"),
            None,
        );
        let outcome = outcome.unwrap();
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.succeeded[0].owners.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_refresh_excludes_sourceless_and_continues_after_failure() {
        let entries = vec![
            with_source("a", "first"),
            Skill::new("b", "no sources", "body"),
            with_source("c", "broken"),
            with_source("d", "last"),
        ];
        let runner = BulkRunner::new(InMemoryEntryStore::with_skills(entries.clone()));

        let outcome = runner.run(
            entries,
            &BulkOperation::RefreshFromSource,
            &ActingUser::anonymous(),
            Some(&UppercaseRefresher),
        );
        let outcome = outcome.unwrap();
        assert_eq!(outcome.excluded_ineligible, 1);
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].skill.id.as_str(), "c");
        assert_eq!(outcome.succeeded[0].content, "BODY");
        assert!(outcome.succeeded[0].source_urls[0].last_fetched_at.is_some());
    }

    #[test]
    fn test_refresh_without_refresher_is_invalid() {
        let runner = BulkRunner::new(InMemoryEntryStore::new());
        let result = runner.run(
            vec![with_source("a", "A")],
            &BulkOperation::RefreshFromSource,
            &ActingUser::anonymous(),
            None,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_assign_blank_owner_is_invalid() {
        let runner = BulkRunner::new(InMemoryEntryStore::new());
        let result = runner.run(
            Vec::new(),
            &BulkOperation::AssignOwner(Owner::named("  ")),
            &ActingUser::anonymous(),
            None,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
