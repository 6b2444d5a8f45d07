//! Import, list and tier inspection commands.

use super::Workspace;
use crate::models::{EntryEvent, EventMeta, Skill, Tier};
use crate::observability::{current_correlation_id, record_event};
use crate::services::TierResolver;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

/// Imports a JSON array of skills, keeping their ids.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a skill cannot
/// be stored. Skills stored before the failure stay stored.
pub fn cmd_import(workspace: &Workspace, path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: "read_import_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let skills: Vec<Skill> =
        serde_json::from_str(&contents).map_err(|e| Error::InvalidInput(format!(
            "{} is not a JSON array of skills: {e}",
            path.display()
        )))?;

    let store = workspace.store();
    let total = skills.len();
    for skill in skills {
        let stored = store.import(skill)?;
        record_event(EntryEvent::Created {
            meta: EventMeta::new("import", current_correlation_id()),
            skill_id: stored.id,
        });
    }
    tracing::info!(imported = total, path = %path.display(), "Imported skills");
    Ok(format!("Imported {total} entries"))
}

/// Lists skills in store order.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn cmd_list(workspace: &Workspace) -> Result<String> {
    let skills = workspace.store().list()?;
    if skills.is_empty() {
        return Ok("No entries".to_string());
    }
    let mut out = String::new();
    for skill in &skills {
        let _ = write!(out, "{}  [{}] {}", skill.id, skill.tier, skill.title);
        if !skill.categories.is_empty() {
            let _ = write!(out, "  ({})", skill.categories.join(", "));
        }
        if !skill.is_active {
            out.push_str("  inactive");
        }
        out.push('\n');
    }
    let _ = write!(out, "{} entries", skills.len());
    Ok(out)
}

/// Shows how skills resolve into tiers for `categories`, optionally limited
/// to `budget` entries.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn cmd_tiers(
    workspace: &Workspace,
    categories: &[String],
    budget: Option<usize>,
) -> Result<String> {
    let skills = workspace.store().list()?;
    let active: HashSet<String> = categories.iter().cloned().collect();
    for unknown in categories.iter().filter(|c| !workspace.registry().contains(c)) {
        tracing::warn!(category = %unknown, "Active category is not registered; overrides for it are ignored");
    }

    let resolver = TierResolver::new(workspace.registry());
    let (groups, dropped) = match budget {
        Some(max) => {
            let budgeted = resolver.resolve_with_budget(&skills, &active, max);
            (budgeted.groups, budgeted.dropped)
        },
        None => (resolver.resolve(&skills, &active), 0),
    };

    let mut out = String::new();
    for tier in Tier::all() {
        let bucket = groups.bucket(*tier);
        let _ = writeln!(out, "{tier} ({})", bucket.len());
        for skill in bucket {
            let _ = writeln!(out, "  {}  {}", skill.id, skill.title);
        }
    }
    if dropped > 0 {
        let _ = writeln!(out, "{dropped} entries dropped by budget");
    }
    Ok(out.trim_end().to_string())
}
