//! Skill types and identifiers.

use super::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Unique identifier for a skill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(String);

impl SkillId {
    /// Creates a new skill ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered skill ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SkillId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A source URL a skill was generated from or refreshed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUrl {
    /// The URL as entered.
    pub url: String,
    /// When the URL was attached to the skill.
    pub added_at: DateTime<Utc>,
    /// When the URL content was last fetched, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl SourceUrl {
    /// Creates a source URL record added at `added_at`.
    #[must_use]
    pub fn new(url: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            added_at,
            last_fetched_at: None,
        }
    }

    /// Returns the identity key: lower-cased with trailing slashes stripped.
    #[must_use]
    pub fn normalized_key(&self) -> String {
        normalize_url(&self.url)
    }
}

/// Normalizes a URL for identity comparison.
///
/// `https://a.com/`, `https://a.com` and `HTTPS://A.COM/` all normalize to
/// `https://a.com`.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

/// Identity of an owner record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "by", content = "value")]
pub enum OwnerKey {
    /// Owner identified by user id.
    UserId(String),
    /// Owner without a user id, identified by display name (case-sensitive).
    Name(String),
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserId(id) => write!(f, "user:{id}"),
            Self::Name(name) => write!(f, "name:{name}"),
        }
    }
}

/// A person responsible for a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Linked user account, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Owner {
    /// Creates an owner with only a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            user_id: None,
            name: name.into(),
            email: None,
            image: None,
        }
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns the dedupe identity: user id when present, else the name.
    #[must_use]
    pub fn identity_key(&self) -> OwnerKey {
        match self.user_id.as_deref() {
            Some(id) if !id.is_empty() => OwnerKey::UserId(id.to_string()),
            _ => OwnerKey::Name(self.name.clone()),
        }
    }
}

/// Kind of change recorded in a skill's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryAction {
    /// Skill was created.
    Created,
    /// Skill fields were edited.
    Updated,
    /// An owner was added.
    OwnerAdded,
    /// An owner was removed.
    OwnerRemoved,
    /// Other skills were merged into this one.
    Merged,
    /// Content was regenerated from source URLs.
    Refreshed,
    /// A category the skill references was renamed or removed.
    CategoryRenamed,
    /// Any action written by another system.
    Other(String),
}

impl HistoryAction {
    /// Returns the action as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::OwnerAdded => "owner_added",
            Self::OwnerRemoved => "owner_removed",
            Self::Merged => "merged",
            Self::Refreshed => "refreshed",
            Self::CategoryRenamed => "category_renamed",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for HistoryAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "owner_added" => Self::OwnerAdded,
            "owner_removed" => Self::OwnerRemoved,
            "merged" => Self::Merged,
            "refreshed" => Self::Refreshed,
            "category_renamed" => Self::CategoryRenamed,
            _ => Self::Other(s),
        }
    }
}

impl From<HistoryAction> for String {
    fn from(action: HistoryAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// When the change happened.
    pub date: DateTime<Utc>,
    /// What happened.
    pub action: HistoryAction,
    /// Human-readable summary.
    pub summary: String,
    /// Who did it, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl HistoryEntry {
    /// Creates a history entry dated `date`.
    #[must_use]
    pub fn new(action: HistoryAction, summary: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            date,
            action,
            summary: summary.into(),
            user: None,
        }
    }

    /// Attributes the entry to the acting user.
    #[must_use]
    pub fn by(mut self, actor: &ActingUser) -> Self {
        self.user = actor.label();
        self
    }
}

/// A curated knowledge record eligible for tiering and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Unique identifier, immutable.
    pub id: SkillId,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Tags, unique.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category names; empty means global.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Default tier placement.
    #[serde(default)]
    pub tier: Tier,
    /// Per-category tier overrides, keyed by category name.
    #[serde(default)]
    pub tier_overrides: BTreeMap<String, Tier>,
    /// Source URLs, unique by normalized URL.
    #[serde(default)]
    pub source_urls: Vec<SourceUrl>,
    /// Owners, unique by identity key.
    #[serde(default)]
    pub owners: Vec<Owner>,
    /// Append-only change history.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Times the skill was used in an answer. Maintained elsewhere.
    #[serde(default)]
    pub usage_count: u64,
    /// Inactive skills are excluded from every tier.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl Skill {
    /// Creates an active Library-tier skill with no provenance.
    #[must_use]
    pub fn new(id: impl Into<SkillId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            categories: Vec::new(),
            tier: Tier::default(),
            tier_overrides: BTreeMap::new(),
            source_urls: Vec::new(),
            owners: Vec::new(),
            history: Vec::new(),
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if any of the skill's categories is in `active`.
    #[must_use]
    pub fn belongs_to_any(&self, active: &HashSet<String>) -> bool {
        self.categories.iter().any(|c| active.contains(c))
    }

    /// Returns true if the skill has an owner with the same identity key.
    #[must_use]
    pub fn has_owner(&self, key: &OwnerKey) -> bool {
        self.owners.iter().any(|o| &o.identity_key() == key)
    }

    /// Returns the content length used for merge-target selection.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Appends a history entry.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

/// Payload for creating a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkill {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category names.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Default tier.
    #[serde(default)]
    pub tier: Tier,
    /// Per-category overrides.
    #[serde(default)]
    pub tier_overrides: BTreeMap<String, Tier>,
    /// Source URLs.
    #[serde(default)]
    pub source_urls: Vec<SourceUrl>,
    /// Owners.
    #[serde(default)]
    pub owners: Vec<Owner>,
}

impl NewSkill {
    /// Creates a payload with a title and content.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Materializes the payload as a stored skill with a `created` history entry.
    #[must_use]
    pub fn into_skill(self, id: SkillId, now: DateTime<Utc>) -> Skill {
        Skill {
            id,
            history: vec![HistoryEntry::new(
                HistoryAction::Created,
                format!("Created \"{}\"", self.title),
                now,
            )],
            title: self.title,
            content: self.content,
            tags: self.tags,
            categories: self.categories,
            tier: self.tier,
            tier_overrides: self.tier_overrides,
            source_urls: self.source_urls,
            owners: self.owners,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<Skill> for NewSkill {
    fn from(skill: Skill) -> Self {
        Self {
            title: skill.title,
            content: skill.content,
            tags: skill.tags,
            categories: skill.categories,
            tier: skill.tier,
            tier_overrides: skill.tier_overrides,
            source_urls: skill.source_urls,
            owners: skill.owners,
        }
    }
}

/// Partial update for a skill. Only `Some` fields change.
///
/// History is append-only: `history_append` entries are pushed after the
/// existing history, never replacing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement tag list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Replacement category list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    /// New default tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Replacement override map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_overrides: Option<BTreeMap<String, Tier>>,
    /// Replacement source URL list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_urls: Option<Vec<SourceUrl>>,
    /// Replacement owner list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Owner>>,
    /// New active flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// History entries to append.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history_append: Vec<HistoryEntry>,
}

impl SkillPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.categories.is_none()
            && self.tier.is_none()
            && self.tier_overrides.is_none()
            && self.source_urls.is_none()
            && self.owners.is_none()
            && self.is_active.is_none()
            && self.history_append.is_empty()
    }

    /// Names of the fields the patch touches, for event payloads.
    #[must_use]
    pub fn modified_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let checks = [
            ("title", self.title.is_some()),
            ("content", self.content.is_some()),
            ("tags", self.tags.is_some()),
            ("categories", self.categories.is_some()),
            ("tier", self.tier.is_some()),
            ("tierOverrides", self.tier_overrides.is_some()),
            ("sourceUrls", self.source_urls.is_some()),
            ("owners", self.owners.is_some()),
            ("isActive", self.is_active.is_some()),
            ("history", !self.history_append.is_empty()),
        ];
        for (name, touched) in checks {
            if touched {
                fields.push(name);
            }
        }
        fields
    }

    /// Applies the patch to `skill`, stamping `updated_at` with `now`.
    pub fn apply_to(&self, skill: &mut Skill, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            skill.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            skill.content.clone_from(content);
        }
        if let Some(tags) = &self.tags {
            skill.tags.clone_from(tags);
        }
        if let Some(categories) = &self.categories {
            skill.categories.clone_from(categories);
        }
        if let Some(tier) = self.tier {
            skill.tier = tier;
        }
        if let Some(overrides) = &self.tier_overrides {
            skill.tier_overrides.clone_from(overrides);
        }
        if let Some(urls) = &self.source_urls {
            skill.source_urls.clone_from(urls);
        }
        if let Some(owners) = &self.owners {
            skill.owners.clone_from(owners);
        }
        if let Some(active) = self.is_active {
            skill.is_active = active;
        }
        skill.history.extend(self.history_append.iter().cloned());
        skill.updated_at = now;
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    /// User account id.
    #[serde(default)]
    pub id: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ActingUser {
    /// An actor with no identity (system jobs, CLI without `--as-user`).
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            id: None,
            email: None,
            name: None,
        }
    }

    /// Creates an actor identified by user id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Creates an actor identified by email.
    #[must_use]
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Best label for history attribution: name, then email, then id.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use test_case::test_case;

    #[test_case("https://a.com/", "https://a.com" ; "trailing slash")]
    #[test_case("HTTPS://A.COM/", "https://a.com" ; "upper case")]
    #[test_case("https://a.com///", "https://a.com" ; "many slashes")]
    #[test_case("https://a.com/Docs/", "https://a.com/docs" ; "path case")]
    fn test_normalize_url(input: &str, expected: &str) {
        assert_eq!(normalize_url(input), expected);
    }

    #[test]
    fn test_owner_identity_prefers_user_id() {
        let a = Owner::named("Ada").with_user_id("u1");
        let b = Owner::named("ada").with_user_id("u1");
        assert_eq!(a.identity_key(), b.identity_key());

        let c = Owner::named("Ada");
        let d = Owner::named("ada");
        assert_ne!(c.identity_key(), d.identity_key());
    }

    #[test]
    fn test_empty_user_id_falls_back_to_name() {
        let owner = Owner::named("Ada").with_user_id("");
        assert_eq!(owner.identity_key(), OwnerKey::Name("Ada".to_string()));
    }

    #[test]
    fn test_history_action_roundtrip() {
        for action in [
            HistoryAction::Created,
            HistoryAction::OwnerAdded,
            HistoryAction::Merged,
            HistoryAction::Other("archived".to_string()),
        ] {
            let json = serde_json::to_string(&action).unwrap();
            let parsed: Option<HistoryAction> = serde_json::from_str(&json).ok();
            assert_eq!(parsed, Some(action));
        }
    }

    #[test]
    fn test_patch_only_touches_provided_fields() {
        let mut skill = Skill::new("s1", "Title", "Body");
        skill.tags = vec!["keep".to_string()];
        let now = Utc::now();

        let patch = SkillPatch {
            content: Some("New body".to_string()),
            history_append: vec![HistoryEntry::new(HistoryAction::Updated, "edit", now)],
            ..SkillPatch::default()
        };
        patch.apply_to(&mut skill, now);

        assert_eq!(skill.title, "Title");
        assert_eq!(skill.content, "New body");
        assert_eq!(skill.tags, vec!["keep".to_string()]);
        assert_eq!(skill.history.len(), 1);
        assert_eq!(skill.updated_at, now);
        assert_eq!(patch.modified_fields(), vec!["content", "history"]);
    }

    #[test]
    fn test_skill_deserializes_with_defaults() {
        let json = r#"{"id":"s1","title":"T","content":"C"}"#;
        let skill: Skill = serde_json::from_str(json).unwrap_or_else(|_| Skill::new("x", "", ""));
        assert_eq!(skill.id.as_str(), "s1");
        assert!(skill.is_active);
        assert_eq!(skill.tier, Tier::Library);
        assert!(skill.tier_overrides.is_empty());
    }

    #[test]
    fn test_new_skill_records_creation() {
        let now = Utc::now();
        let skill = NewSkill::new("Refunds", "How to refund").into_skill(SkillId::new("s9"), now);
        assert_eq!(skill.history.len(), 1);
        assert_eq!(skill.history[0].action, HistoryAction::Created);
        assert_eq!(skill.created_at, now);
    }

    #[test]
    fn test_content_len_counts_chars() {
        let skill = Skill::new("s1", "T", "héllo");
        assert_eq!(skill.content_len(), 5);
    }
}
