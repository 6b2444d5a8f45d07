//! Data models for skillvault.
//!
//! This module contains all the core data structures used throughout the system.

mod analysis;
mod category;
mod events;
mod skill;
mod tier;

pub use analysis::{
    EntryPreview, LibraryAnalysis, MAX_HEALTH_SCORE, Priority, Recommendation, RecommendationKey,
    RecommendationType,
};
pub use category::{Category, CategoryRegistry};
pub use events::{EntryEvent, EventMeta};
pub use skill::{
    ActingUser, HistoryAction, HistoryEntry, NewSkill, Owner, OwnerKey, Skill, SkillId,
    SkillPatch, SourceUrl, normalize_url,
};
pub use tier::{Tier, TierGroups};
