//! Category maintenance commands.
//!
//! The registry lives in configuration, so after a rename or removal the
//! command prints the new order for the user to save.

use super::{Workspace, render_bulk_outcome};
use crate::Result;
use crate::models::ActingUser;
use crate::services::CategoryService;

/// Renames a category and rekeys every skill that references it.
///
/// # Errors
///
/// Returns an error if `old` is unknown, `new` is invalid or taken, or the
/// store cannot be read.
pub fn cmd_rename_category(
    workspace: &mut Workspace,
    old: &str,
    new: &str,
    actor: &ActingUser,
) -> Result<String> {
    let service = CategoryService::new(workspace.store());
    let outcome = service.rename(workspace.registry_mut(), old, new, actor)?;
    Ok(format!(
        "{}\n{}",
        render_bulk_outcome(&outcome),
        registry_hint(workspace)
    ))
}

/// Removes a category and strips it from every skill.
///
/// # Errors
///
/// Returns an error if the category is unknown or the store cannot be read.
pub fn cmd_remove_category(
    workspace: &mut Workspace,
    name: &str,
    actor: &ActingUser,
) -> Result<String> {
    let service = CategoryService::new(workspace.store());
    let outcome = service.remove(workspace.registry_mut(), name, actor)?;
    Ok(format!(
        "{}\n{}",
        render_bulk_outcome(&outcome),
        registry_hint(workspace)
    ))
}

fn registry_hint(workspace: &Workspace) -> String {
    let names: Vec<String> = workspace
        .registry()
        .names()
        .map(|n| format!("\"{n}\""))
        .collect();
    format!("Update your config: categories = [{}]", names.join(", "))
}
