//! Binary entry point for skillvault.
//!
//! This binary provides the CLI interface for tiering and consolidating the
//! skill library.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use skillvault::cli::{
    Workspace, cmd_analyze, cmd_bulk, cmd_import, cmd_list, cmd_merge, cmd_remove_category,
    cmd_rename_category, cmd_tiers,
};
use skillvault::config::SkillVaultConfig;
use skillvault::models::{ActingUser, Owner, OwnerKey, RecommendationKey, SkillId};
use skillvault::observability::{self, OperationContext, enter_operation_context};
use skillvault::services::BulkOperation;
use std::path::PathBuf;
use std::process::ExitCode;

/// Skillvault - tiering and consolidation for a curated skill library.
#[derive(Parser)]
#[command(name = "skillvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "SKILLVAULT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    actor: ActorArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Identity of the acting user. Without any of these the actor is anonymous.
#[derive(Args)]
struct ActorArgs {
    /// Act as this user id.
    #[arg(long = "as-user", global = true)]
    user_id: Option<String>,

    /// Act as this email address.
    #[arg(long = "as-email", global = true)]
    email: Option<String>,

    /// Display name recorded in history.
    #[arg(long = "as-name", global = true)]
    name: Option<String>,
}

impl ActorArgs {
    fn to_actor(&self) -> ActingUser {
        ActingUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import skills from a JSON array, keeping their ids.
    Import {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// List skills in store order.
    List,

    /// Show tier resolution for a set of active categories.
    Tiers {
        /// Active category (repeatable).
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Keep at most this many entries.
        #[arg(short, long)]
        budget: Option<usize>,
    },

    /// Merge two or more skills into one.
    Merge {
        /// Skill ids.
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,

        /// Skip the LLM and use the deterministic fallback content.
        #[arg(long)]
        no_llm: bool,
    },

    /// Add an owner to skills.
    AssignOwner {
        /// Owner display name.
        #[arg(long)]
        name: String,

        /// Owner user id.
        #[arg(long)]
        user_id: Option<String>,

        /// Owner email.
        #[arg(long)]
        email: Option<String>,

        /// Skill ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Remove an owner from skills.
    RemoveOwner {
        /// Owner user id.
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        user_id: Option<String>,

        /// Owner display name, for owners without a user id.
        #[arg(long)]
        name: Option<String>,

        /// Skill ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Regenerate skills from their source URLs.
    Refresh {
        /// Skill ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Analyze library health.
    Analyze {
        /// Apply the merge recommendation with this key (e.g. `merge:a,b`).
        #[arg(long)]
        merge: Option<String>,
    },

    /// Rename a category and rekey every skill.
    RenameCategory {
        /// Current name.
        old: String,
        /// New name.
        new: String,
    },

    /// Remove a category from the registry and from every skill.
    RemoveCategory {
        /// Category name.
        name: String,
    },
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Import { .. } => "import",
            Self::List => "list",
            Self::Tiers { .. } => "tiers",
            Self::Merge { .. } => "merge",
            Self::AssignOwner { .. } => "assign-owner",
            Self::RemoveOwner { .. } => "remove-owner",
            Self::Refresh { .. } => "refresh",
            Self::Analyze { .. } => "analyze",
            Self::RenameCategory { .. } => "rename-category",
            Self::RemoveCategory { .. } => "remove-category",
        }
    }
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(Some(&config.logging), cli.verbose)
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let actor = cli.actor.to_actor();
    let mut context = OperationContext::new();
    if let Some(label) = actor.label() {
        context = context.with_actor(label);
    }
    let _context = enter_operation_context(context);
    tracing::debug!(command = cli.command.name(), "Running command");

    match run_command(cli.command, config, &actor) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command and returns its output.
fn run_command(
    command: Commands,
    config: SkillVaultConfig,
    actor: &ActingUser,
) -> anyhow::Result<String> {
    let mut workspace = Workspace::open(config).context("opening the entry store")?;

    let output = match command {
        Commands::Import { file } => cmd_import(&workspace, &file)?,
        Commands::List => cmd_list(&workspace)?,
        Commands::Tiers { categories, budget } => cmd_tiers(&workspace, &categories, budget)?,
        Commands::Merge { ids, no_llm } => cmd_merge(&workspace, &to_ids(ids), !no_llm, actor)?,
        Commands::AssignOwner {
            name,
            user_id,
            email,
            ids,
        } => {
            let mut owner = Owner::named(name);
            if let Some(user_id) = user_id {
                owner = owner.with_user_id(user_id);
            }
            if let Some(email) = email {
                owner = owner.with_email(email);
            }
            cmd_bulk(
                &workspace,
                &to_ids(ids),
                &BulkOperation::AssignOwner(owner),
                actor,
            )?
        },
        Commands::RemoveOwner { user_id, name, ids } => {
            let key = match (user_id, name) {
                (Some(user_id), _) => OwnerKey::UserId(user_id),
                (None, Some(name)) => OwnerKey::Name(name),
                (None, None) => anyhow::bail!("remove-owner needs --user-id or --name"),
            };
            cmd_bulk(
                &workspace,
                &to_ids(ids),
                &BulkOperation::RemoveOwner(key),
                actor,
            )?
        },
        Commands::Refresh { ids } => cmd_bulk(
            &workspace,
            &to_ids(ids),
            &BulkOperation::RefreshFromSource,
            actor,
        )?,
        Commands::Analyze { merge } => {
            let key = merge.as_deref().map(RecommendationKey::from);
            cmd_analyze(&workspace, key.as_ref(), actor)?
        },
        Commands::RenameCategory { old, new } => {
            cmd_rename_category(&mut workspace, &old, &new, actor)?
        },
        Commands::RemoveCategory { name } => cmd_remove_category(&mut workspace, &name, actor)?,
    };
    Ok(output)
}

fn to_ids(ids: Vec<String>) -> Vec<SkillId> {
    ids.into_iter().map(SkillId::new).collect()
}

/// Loads configuration from `path`, or the default location, then applies
/// environment overrides.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<SkillVaultConfig> {
    let config = match path {
        Some(path) => SkillVaultConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => SkillVaultConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tiers_parses_categories_and_budget() {
        let cli = Cli::try_parse_from([
            "skillvault",
            "-c",
            "custom.toml",
            "tiers",
            "--category",
            "billing",
            "--category",
            "security",
            "-b",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Commands::Tiers { categories, budget } = cli.command else {
            unreachable!("parsed tiers");
        };
        assert_eq!(categories, vec!["billing", "security"]);
        assert_eq!(budget, Some(3));
    }
}
