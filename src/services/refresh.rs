//! Refresh-from-source collaborator.

use crate::Result;
use crate::models::Skill;

/// Regenerates a skill from its source URLs.
///
/// Called once per skill, one at a time. A failure affects only that skill.
pub trait SourceRefresher: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the refreshed skill. Only the title, content, tags and source
    /// URLs of the result are persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be fetched or the content
    /// cannot be regenerated.
    fn refresh_from_source(&self, skill: &Skill) -> Result<Skill>;
}
