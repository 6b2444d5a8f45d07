//! Bulk owner and refresh commands.

use super::{Workspace, build_refresher};
use crate::Result;
use crate::models::{ActingUser, SkillId};
use crate::services::{BulkOperation, BulkOutcome, BulkRunner};
use std::fmt::Write as _;

/// Runs `op` over `ids` on behalf of `actor`.
///
/// # Errors
///
/// Returns an error if an id is unknown or the operation cannot start (for
/// example a refresh with no LLM provider configured). Per-skill failures
/// are part of the rendered outcome, not errors.
pub fn cmd_bulk(
    workspace: &Workspace,
    ids: &[SkillId],
    op: &BulkOperation,
    actor: &ActingUser,
) -> Result<String> {
    let skills = workspace.load_skills(ids)?;
    let refresher = match op {
        BulkOperation::RefreshFromSource => build_refresher(&workspace.config().llm),
        BulkOperation::AssignOwner(_) | BulkOperation::RemoveOwner(_) => None,
    };
    let runner = BulkRunner::new(workspace.store());
    let outcome = runner.run(skills, op, actor, refresher.as_deref())?;
    Ok(render_bulk_outcome(&outcome))
}

/// Renders a bulk outcome: the summary, then one line per failure.
#[must_use]
pub fn render_bulk_outcome(outcome: &BulkOutcome) -> String {
    let mut out = format!(
        "{}: {} of {} attempted. {}",
        outcome.operation,
        outcome.succeeded.len(),
        outcome.attempted,
        outcome.summary()
    );
    for failure in &outcome.failed {
        let _ = write!(out, "\n  {} ({}): {}", failure.skill.id, failure.skill.title, failure.error);
    }
    out
}
