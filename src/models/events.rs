//! Entry event types for audit and observability.
//!
//! Every mutation the engine performs emits one of these, so an external
//! audit system can attribute changes without the engine writing audit
//! records itself.

use super::{OwnerKey, SkillId};
use chrono::Utc;
use uuid::Uuid;

/// Shared event metadata required for observability.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Optional correlation identifier for request/trace linking.
    pub correlation_id: Option<String>,
    /// Event source component.
    pub source: &'static str,
    /// Acting user label, when known.
    pub actor: Option<String>,
    /// Timestamp (Unix epoch seconds).
    pub timestamp: i64,
}

impl EventMeta {
    /// Creates new event metadata using the current timestamp.
    #[must_use]
    pub fn new(source: &'static str, correlation_id: Option<String>) -> Self {
        Self::with_timestamp(source, correlation_id, Utc::now().timestamp())
    }

    /// Creates new event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(
        source: &'static str,
        correlation_id: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            correlation_id,
            source,
            actor: None,
            timestamp,
        }
    }

    /// Attaches the acting user label.
    #[must_use]
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

/// Events emitted during library operations.
#[derive(Debug, Clone)]
pub enum EntryEvent {
    /// A skill was created.
    Created {
        /// Event metadata.
        meta: EventMeta,
        /// The new skill.
        skill_id: SkillId,
    },
    /// A skill was updated.
    Updated {
        /// Event metadata.
        meta: EventMeta,
        /// The updated skill.
        skill_id: SkillId,
        /// Fields that were modified.
        modified_fields: Vec<String>,
    },
    /// A skill was deleted.
    Deleted {
        /// Event metadata.
        meta: EventMeta,
        /// The deleted skill.
        skill_id: SkillId,
        /// Reason for deletion.
        reason: String,
    },
    /// Skills were merged into a target.
    Merged {
        /// Event metadata.
        meta: EventMeta,
        /// The surviving skill.
        target_id: SkillId,
        /// The retired skills.
        merged_ids: Vec<SkillId>,
        /// Whether the fallback content path was used.
        degraded: bool,
    },
    /// An owner was added to a skill.
    OwnerAdded {
        /// Event metadata.
        meta: EventMeta,
        /// The skill.
        skill_id: SkillId,
        /// The owner identity.
        owner: OwnerKey,
    },
    /// An owner was removed from a skill.
    OwnerRemoved {
        /// Event metadata.
        meta: EventMeta,
        /// The skill.
        skill_id: SkillId,
        /// The owner identity.
        owner: OwnerKey,
    },
    /// A skill was refreshed from its source URLs.
    Refreshed {
        /// Event metadata.
        meta: EventMeta,
        /// The skill.
        skill_id: SkillId,
        /// Number of source URLs consulted.
        sources: usize,
    },
    /// A category was renamed or removed and skills were rekeyed.
    CategoryRenamed {
        /// Event metadata.
        meta: EventMeta,
        /// Previous name.
        old_name: String,
        /// New name; `None` when the category was removed.
        new_name: Option<String>,
        /// Number of skills rekeyed.
        affected: usize,
    },
    /// A library analysis completed.
    Analyzed {
        /// Event metadata.
        meta: EventMeta,
        /// Number of entries analyzed.
        entries: usize,
        /// Number of recommendations kept.
        recommendations: usize,
        /// Whether the analyzer degraded or failed.
        degraded: bool,
    },
}

impl EntryEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
            Self::Merged { .. } => "merged",
            Self::OwnerAdded { .. } => "owner_added",
            Self::OwnerRemoved { .. } => "owner_removed",
            Self::Refreshed { .. } => "refreshed",
            Self::CategoryRenamed { .. } => "category_renamed",
            Self::Analyzed { .. } => "analyzed",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::Created { meta, .. }
            | Self::Updated { meta, .. }
            | Self::Deleted { meta, .. }
            | Self::Merged { meta, .. }
            | Self::OwnerAdded { meta, .. }
            | Self::OwnerRemoved { meta, .. }
            | Self::Refreshed { meta, .. }
            | Self::CategoryRenamed { meta, .. }
            | Self::Analyzed { meta, .. } => meta,
        }
    }

    /// Returns the skill the event is about, if it concerns a single skill.
    #[must_use]
    pub const fn skill_id(&self) -> Option<&SkillId> {
        match self {
            Self::Created { skill_id, .. }
            | Self::Updated { skill_id, .. }
            | Self::Deleted { skill_id, .. }
            | Self::OwnerAdded { skill_id, .. }
            | Self::OwnerRemoved { skill_id, .. }
            | Self::Refreshed { skill_id, .. } => Some(skill_id),
            Self::Merged { target_id, .. } => Some(target_id),
            Self::CategoryRenamed { .. } | Self::Analyzed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_skill_id() {
        let event = EntryEvent::Merged {
            meta: EventMeta::with_timestamp("test", None, 1),
            target_id: SkillId::new("t"),
            merged_ids: vec![SkillId::new("l")],
            degraded: false,
        };
        assert_eq!(event.event_type(), "merged");
        assert_eq!(event.skill_id().map(SkillId::as_str), Some("t"));
        assert_eq!(event.meta().timestamp, 1);
    }

    #[test]
    fn test_meta_ids_are_unique() {
        let a = EventMeta::new("test", None);
        let b = EventMeta::new("test", None);
        assert_ne!(a.event_id, b.event_id);
    }
}
