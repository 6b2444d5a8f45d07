//! Ownership-based edit authorization.
//!
//! Ownerless skills are unrestricted. Otherwise the acting user must appear
//! among the owners, matched by user id (exact) or by email (case-insensitive).
//! There is no role escalation at this layer.
//!
//! # Example
//!
//! ```rust
//! use skillvault::models::{ActingUser, Owner, Skill};
//! use skillvault::security::can_edit;
//!
//! let mut skill = Skill::new("s1", "Refund policy", "...");
//! assert!(can_edit(&skill, &ActingUser::anonymous()));
//!
//! skill.owners.push(Owner::named("Ana").with_email("Ana@Example.com"));
//! assert!(can_edit(&skill, &ActingUser::with_email("ana@example.com")));
//! assert!(!can_edit(&skill, &ActingUser::with_id("u-2")));
//! ```

use crate::models::{ActingUser, Owner, Skill};
use crate::{Error, Result};

/// Result of an edit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAccess {
    /// The skill has no owners.
    Unrestricted,
    /// The actor is one of the owners.
    Owner,
    /// The actor is not an owner.
    Denied,
}

impl EditAccess {
    /// Returns true if editing is allowed.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Classifies the actor's access to `skill`.
#[must_use]
pub fn check_edit_access(skill: &Skill, actor: &ActingUser) -> EditAccess {
    if skill.owners.is_empty() {
        return EditAccess::Unrestricted;
    }
    if skill.owners.iter().any(|owner| matches_actor(owner, actor)) {
        EditAccess::Owner
    } else {
        EditAccess::Denied
    }
}

/// Returns true if `actor` may mutate `skill`.
#[must_use]
pub fn can_edit(skill: &Skill, actor: &ActingUser) -> bool {
    check_edit_access(skill, actor).is_granted()
}

/// Gate form of [`can_edit`].
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] if the actor is not an owner.
pub fn ensure_can_edit(skill: &Skill, actor: &ActingUser) -> Result<()> {
    if can_edit(skill, actor) {
        Ok(())
    } else {
        Err(Error::Unauthorized(format!(
            "{} is not an owner of skill {}",
            actor.label().unwrap_or_else(|| "anonymous user".to_string()),
            skill.id
        )))
    }
}

/// Splits `entries` into editable skills, keeping input order, and the number
/// excluded.
#[must_use]
pub fn filter_editable(entries: Vec<Skill>, actor: &ActingUser) -> (Vec<Skill>, usize) {
    let total = entries.len();
    let editable: Vec<Skill> = entries
        .into_iter()
        .filter(|skill| can_edit(skill, actor))
        .collect();
    let excluded = total - editable.len();
    (editable, excluded)
}

fn matches_actor(owner: &Owner, actor: &ActingUser) -> bool {
    let id_match = match (owner.user_id.as_deref(), actor.id.as_deref()) {
        (Some(owner_id), Some(actor_id)) => !owner_id.is_empty() && owner_id == actor_id,
        _ => false,
    };
    id_match || emails_match(owner.email.as_deref(), actor.email.as_deref())
}

fn emails_match(owner: Option<&str>, actor: Option<&str>) -> bool {
    match (owner.map(str::trim), actor.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}
