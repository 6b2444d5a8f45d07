//! Tier types for progressive disclosure.

use super::Skill;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusion tier for a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Core tier: always included.
    Core,
    /// Extended tier: included when one of the skill's categories is active.
    Extended,
    /// Library tier: global fallback (default).
    #[default]
    Library,
}

impl Tier {
    /// Returns all tiers in inclusion order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Core, Self::Extended, Self::Library]
    }

    /// Returns the tier as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Extended => "extended",
            Self::Library => "library",
        }
    }

    /// Parses a tier name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "core" => Some(Self::Core),
            "extended" => Some(Self::Extended),
            "library" => Some(Self::Library),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered inclusion groups produced by tier resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierGroups {
    /// Always-included skills.
    pub core: Vec<Skill>,
    /// Skills included because one of their categories is active.
    pub extended: Vec<Skill>,
    /// Remaining active skills.
    pub library: Vec<Skill>,
}

impl TierGroups {
    /// Returns the bucket for `tier`.
    #[must_use]
    pub fn bucket(&self, tier: Tier) -> &[Skill] {
        match tier {
            Tier::Core => &self.core,
            Tier::Extended => &self.extended,
            Tier::Library => &self.library,
        }
    }

    /// Total number of skills across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len() + self.extended.len() + self.library.len()
    }

    /// Returns true if every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates skills in inclusion order: Core, then Extended, then Library.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &Skill)> {
        self.core
            .iter()
            .map(|s| (Tier::Core, s))
            .chain(self.extended.iter().map(|s| (Tier::Extended, s)))
            .chain(self.library.iter().map(|s| (Tier::Library, s)))
    }
}
