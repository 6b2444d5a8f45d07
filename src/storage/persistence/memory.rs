//! In-memory entry store.
//!
//! Keeps skills in insertion order behind a mutex. Used by tests and by the
//! CLI when no database path is configured.

use crate::models::{NewSkill, Skill, SkillId, SkillPatch};
use crate::storage::sqlite::{StoreTimer, acquire_lock};
use crate::storage::traits::EntryStore;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Mutex;

/// In-memory entry store.
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    skills: Mutex<Vec<Skill>>,
}

impl InMemoryEntryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `skills`, in order.
    #[must_use]
    pub fn with_skills(skills: Vec<Skill>) -> Self {
        Self {
            skills: Mutex::new(skills),
        }
    }

    fn not_found(id: &SkillId) -> Error {
        Error::NotFound {
            kind: "skill",
            id: id.to_string(),
        }
    }
}

impl EntryStore for InMemoryEntryStore {
    fn list(&self) -> Result<Vec<Skill>> {
        Ok(acquire_lock(&self.skills).clone())
    }

    fn get(&self, id: &SkillId) -> Result<Option<Skill>> {
        Ok(acquire_lock(&self.skills)
            .iter()
            .find(|s| &s.id == id)
            .cloned())
    }

    fn create(&self, skill: NewSkill) -> Result<Skill> {
        let timer = StoreTimer::start("memory", "create");
        let created = skill.into_skill(SkillId::generate(), Utc::now());
        acquire_lock(&self.skills).push(created.clone());
        timer.finish(Ok(created))
    }

    fn import(&self, skill: Skill) -> Result<Skill> {
        let mut skills = acquire_lock(&self.skills);
        if let Some(existing) = skills.iter_mut().find(|s| s.id == skill.id) {
            *existing = skill.clone();
        } else {
            skills.push(skill.clone());
        }
        Ok(skill)
    }

    fn update(&self, id: &SkillId, patch: &SkillPatch) -> Result<Skill> {
        let timer = StoreTimer::start("memory", "update");
        let result = {
            let mut skills = acquire_lock(&self.skills);
            skills
                .iter_mut()
                .find(|s| &s.id == id)
                .map(|skill| {
                    patch.apply_to(skill, Utc::now());
                    skill.clone()
                })
                .ok_or_else(|| Self::not_found(id))
        };
        timer.finish(result)
    }

    fn delete(&self, id: &SkillId) -> Result<()> {
        let timer = StoreTimer::start("memory", "delete");
        let result = {
            let mut skills = acquire_lock(&self.skills);
            skills
                .iter()
                .position(|s| &s.id == id)
                .map(|idx| {
                    skills.remove(idx);
                })
                .ok_or_else(|| Self::not_found(id))
        };
        timer.finish(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = InMemoryEntryStore::new();
        for title in ["a", "b", "c"] {
            assert!(store.create(NewSkill::new(title, "")).is_ok());
        }
        let titles: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let store = InMemoryEntryStore::new();
        let id = SkillId::new("missing");
        assert!(matches!(
            store.update(&id, &SkillPatch::default()),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(store.delete(&id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_import_replaces_in_place() {
        let store = InMemoryEntryStore::with_skills(vec![
            Skill::new("a", "A", ""),
            Skill::new("b", "B", ""),
        ]);
        assert!(store.import(Skill::new("a", "A2", "")).is_ok());
        let skills = store.list().unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].title, "A2");
    }

    #[test]
    fn test_update_applies_patch() {
        let store = InMemoryEntryStore::with_skills(vec![Skill::new("a", "A", "old")]);
        let patch = SkillPatch {
            content: Some("new".to_string()),
            ..SkillPatch::default()
        };
        let updated = store.update(&SkillId::new("a"), &patch);
        assert_eq!(updated.map(|s| s.content).ok().as_deref(), Some("new"));
        assert_eq!(
            store.require(&SkillId::new("a")).map(|s| s.content).ok().as_deref(),
            Some("new")
        );
    }
}
