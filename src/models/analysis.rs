//! Library health analysis types.

use super::SkillId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of library recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    /// Entries overlap and should be consolidated.
    Merge,
    /// An entry covers too much and should be split.
    Split,
    /// An entry's title is misleading.
    Rename,
    /// An entry's tags are wrong or missing.
    Retag,
    /// The library is missing coverage for a topic.
    Gap,
}

impl RecommendationType {
    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Rename => "rename",
            Self::Retag => "retag",
            Self::Gap => "gap",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Act soon.
    High,
    /// Worth doing.
    #[default]
    Medium,
    /// Nice to have.
    Low,
}

/// Stable identity of a recommendation: its type plus the sorted affected ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationKey(String);

impl RecommendationKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecommendationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecommendationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One recommendation returned by the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommendation kind.
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Short title.
    pub title: String,
    /// Explanation.
    #[serde(default)]
    pub description: String,
    /// Skills the recommendation concerns.
    #[serde(default)]
    pub affected_entry_ids: Vec<SkillId>,
    /// Optional concrete suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl Recommendation {
    /// Returns the recommendation's identity key.
    #[must_use]
    pub fn key(&self) -> RecommendationKey {
        let mut ids: Vec<&str> = self.affected_entry_ids.iter().map(SkillId::as_str).collect();
        ids.sort_unstable();
        RecommendationKey(format!("{}:{}", self.kind, ids.join(",")))
    }

    /// Returns true for merge recommendations.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.kind == RecommendationType::Merge
    }
}

/// Result of analyzing the whole library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryAnalysis {
    /// Recommendations, in analyzer order.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    /// Prose summary.
    #[serde(default)]
    pub summary: String,
    /// Health score, 0 to 100.
    ///
    /// Any JSON number is accepted and clamped into range; fractions round.
    #[serde(default, deserialize_with = "deserialize_health_score")]
    pub health_score: u8,
    /// Analyzer-specific explanation of how the result was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<serde_json::Value>,
}

/// Upper bound of [`LibraryAnalysis::health_score`].
pub const MAX_HEALTH_SCORE: u8 = 100;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn deserialize_health_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    // clamped to 0..=100 before the cast
    Ok(raw.clamp(0.0, f64::from(MAX_HEALTH_SCORE)).round() as u8)
}

/// Compact view of a skill sent to the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPreview {
    /// Skill id.
    pub id: SkillId,
    /// Title.
    pub title: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Truncated content.
    pub content_preview: String,
}
