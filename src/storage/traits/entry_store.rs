//! Entry store trait.

use crate::models::{NewSkill, Skill, SkillId, SkillPatch};
use crate::{Error, Result};
use std::sync::Arc;

/// Trait for entry store backends.
///
/// Entry stores are the authoritative source of truth for skills. The engine
/// never caches beyond a single operation: last write wins at this boundary.
///
/// `list` returns skills in the store's native order, which tier resolution
/// preserves.
pub trait EntryStore: Send + Sync {
    /// Lists all skills in native order.
    fn list(&self) -> Result<Vec<Skill>>;

    /// Retrieves a skill by ID.
    fn get(&self, id: &SkillId) -> Result<Option<Skill>>;

    /// Creates a skill with a fresh ID.
    fn create(&self, skill: NewSkill) -> Result<Skill>;

    /// Inserts or replaces a skill, keeping its ID. Used for imports.
    fn import(&self, skill: Skill) -> Result<Skill>;

    /// Applies a partial update and returns the stored result.
    ///
    /// Fails with [`Error::NotFound`] if the skill does not exist.
    fn update(&self, id: &SkillId, patch: &SkillPatch) -> Result<Skill>;

    /// Deletes a skill. Deletion is unconditional; there is no soft delete.
    ///
    /// Fails with [`Error::NotFound`] if the skill does not exist.
    fn delete(&self, id: &SkillId) -> Result<()>;

    /// Retrieves a skill, failing if it does not exist.
    fn require(&self, id: &SkillId) -> Result<Skill> {
        self.get(id)?.ok_or_else(|| Error::NotFound {
            kind: "skill",
            id: id.to_string(),
        })
    }

    /// Returns the total count of skills.
    fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}

impl<T: EntryStore + ?Sized> EntryStore for &T {
    fn list(&self) -> Result<Vec<Skill>> {
        (**self).list()
    }

    fn get(&self, id: &SkillId) -> Result<Option<Skill>> {
        (**self).get(id)
    }

    fn create(&self, skill: NewSkill) -> Result<Skill> {
        (**self).create(skill)
    }

    fn import(&self, skill: Skill) -> Result<Skill> {
        (**self).import(skill)
    }

    fn update(&self, id: &SkillId, patch: &SkillPatch) -> Result<Skill> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &SkillId) -> Result<()> {
        (**self).delete(id)
    }
}

impl<T: EntryStore + ?Sized> EntryStore for Arc<T> {
    fn list(&self) -> Result<Vec<Skill>> {
        (**self).list()
    }

    fn get(&self, id: &SkillId) -> Result<Option<Skill>> {
        (**self).get(id)
    }

    fn create(&self, skill: NewSkill) -> Result<Skill> {
        (**self).create(skill)
    }

    fn import(&self, skill: Skill) -> Result<Skill> {
        (**self).import(skill)
    }

    fn update(&self, id: &SkillId, patch: &SkillPatch) -> Result<Skill> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &SkillId) -> Result<()> {
        (**self).delete(id)
    }
}
