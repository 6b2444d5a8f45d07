//! Integration tests for bulk operations.
//!
//! Per-item isolation, authorization filtering and skip accounting.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Utc;
use skillvault::models::{NewSkill, OwnerKey};
use skillvault::services::SourceRefresher;
use skillvault::{
    ActingUser, BulkOperation, BulkRunner, EntryStore, Error, InMemoryEntryStore, Owner, Skill,
    SkillId, SkillPatch, SourceUrl,
};
use std::collections::HashSet;

/// Store whose updates fail for the chosen ids.
struct PartiallyFailingStore {
    inner: InMemoryEntryStore,
    failing: HashSet<SkillId>,
}

impl EntryStore for PartiallyFailingStore {
    fn list(&self) -> skillvault::Result<Vec<Skill>> {
        self.inner.list()
    }

    fn get(&self, id: &SkillId) -> skillvault::Result<Option<Skill>> {
        self.inner.get(id)
    }

    fn create(&self, skill: NewSkill) -> skillvault::Result<Skill> {
        self.inner.create(skill)
    }

    fn import(&self, skill: Skill) -> skillvault::Result<Skill> {
        self.inner.import(skill)
    }

    fn update(&self, id: &SkillId, patch: &SkillPatch) -> skillvault::Result<Skill> {
        if self.failing.contains(id) {
            return Err(Error::OperationFailed {
                operation: "update".to_string(),
                cause: "disk full".to_string(),
            });
        }
        self.inner.update(id, patch)
    }

    fn delete(&self, id: &SkillId) -> skillvault::Result<()> {
        self.inner.delete(id)
    }
}

struct StampingRefresher;

impl SourceRefresher for StampingRefresher {
    fn name(&self) -> &'static str {
        "stamping"
    }

    fn refresh_from_source(&self, skill: &Skill) -> skillvault::Result<Skill> {
        if skill.id.as_str() == "broken" {
            return Err(Error::Collaborator {
                collaborator: "stamping",
                cause: "404".to_string(),
            });
        }
        let mut refreshed = skill.clone();
        refreshed.content = format!("{} (refreshed)", skill.content);
        Ok(refreshed)
    }
}

fn numbered(n: usize) -> Vec<Skill> {
    (1..=n)
        .map(|i| Skill::new(format!("e{i}"), format!("Entry {i}"), "body"))
        .collect()
}

#[test]
fn test_one_failure_does_not_stop_the_batch() {
    let skills = numbered(5);
    let store = PartiallyFailingStore {
        inner: InMemoryEntryStore::with_skills(skills.clone()),
        failing: HashSet::from([SkillId::new("e3")]),
    };
    let runner = BulkRunner::new(&store);
    let op = BulkOperation::AssignOwner(Owner::named("Ana").with_user_id("u-1"));

    let outcome = runner
        .run(skills, &op, &ActingUser::anonymous(), None)
        .unwrap();

    assert_eq!(outcome.attempted, 5);
    assert_eq!(outcome.succeeded.len(), 4);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].skill.id.as_str(), "e3");
    assert!(outcome.failed[0].error.contains("disk full"));
    assert_eq!(outcome.summary(), "4 succeeded, 1 failed");

    let e5 = store.require(&SkillId::new("e5")).unwrap();
    assert!(e5.has_owner(&OwnerKey::UserId("u-1".to_string())));
    let e3 = store.require(&SkillId::new("e3")).unwrap();
    assert!(e3.owners.is_empty());
}

#[test]
fn test_duplicate_owner_is_skipped() {
    let mut owned = Skill::new("a", "Owned", "");
    owned.owners = vec![Owner::named("Ana").with_user_id("u-1")];
    let skills = vec![owned, Skill::new("b", "Unowned", "")];
    let store = InMemoryEntryStore::with_skills(skills.clone());

    // Acting as the existing owner, so both entries are editable.
    let op = BulkOperation::AssignOwner(Owner::named("Ana R.").with_user_id("u-1"));
    let outcome = BulkRunner::new(&store)
        .run(skills, &op, &ActingUser::with_id("u-1"), None)
        .unwrap();

    assert_eq!(outcome.excluded_unauthorized, 0);
    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].id.as_str(), "a");
    assert_eq!(store.require(&SkillId::new("a")).unwrap().owners.len(), 1);
}

#[test]
fn test_unauthorized_entries_are_excluded_not_failed() {
    let mut mine = Skill::new("mine", "Mine", "");
    mine.owners = vec![Owner::named("Ana").with_email("ana@example.com")];
    let mut theirs = Skill::new("theirs", "Theirs", "");
    theirs.owners = vec![Owner::named("Bo").with_user_id("u-2")];
    let unowned = Skill::new("open", "Open", "");
    let skills = vec![mine, theirs, unowned];
    let store = InMemoryEntryStore::with_skills(skills.clone());

    let op = BulkOperation::RemoveOwner(OwnerKey::Name("Ana".to_string()));
    let outcome = BulkRunner::new(&store)
        .run(skills, &op, &ActingUser::with_email(" Ana@Example.com "), None)
        .unwrap();

    assert_eq!(outcome.excluded_unauthorized, 1);
    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.failed.len(), 0);
    // Ana has an email but no user id, so her identity key is her name.
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
}

#[test]
fn test_nothing_editable_is_distinguishable() {
    let mut theirs = Skill::new("theirs", "Theirs", "");
    theirs.owners = vec![Owner::named("Bo").with_user_id("u-2")];
    let store = InMemoryEntryStore::with_skills(vec![theirs.clone()]);

    let outcome = BulkRunner::new(&store)
        .run(
            vec![theirs],
            &BulkOperation::AssignOwner(Owner::named("Eve")),
            &ActingUser::with_id("u-9"),
            None,
        )
        .unwrap();

    assert!(outcome.nothing_editable());
    assert!(outcome.is_success());
    assert_eq!(outcome.summary(), "Nothing to do: 1 not editable by you");
}

#[test]
fn test_refresh_isolates_collaborator_failures() {
    let mut skills = numbered(2);
    skills.push(Skill::new("broken", "Broken", "body"));
    for skill in &mut skills {
        skill.source_urls = vec![SourceUrl::new(format!("https://example.com/{}", skill.id), Utc::now())];
    }
    skills.push(Skill::new("nosource", "No source", "body"));
    let store = InMemoryEntryStore::with_skills(skills.clone());

    let outcome = BulkRunner::new(&store)
        .run(
            skills,
            &BulkOperation::RefreshFromSource,
            &ActingUser::anonymous(),
            Some(&StampingRefresher),
        )
        .unwrap();

    assert_eq!(outcome.excluded_ineligible, 1);
    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    let refreshed = store.require(&SkillId::new("e1")).unwrap();
    assert_eq!(refreshed.content, "body (refreshed)");
    assert!(refreshed.source_urls[0].last_fetched_at.is_some());
}
