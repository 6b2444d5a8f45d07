//! CLI command implementations.
//!
//! Each command takes a [`Workspace`] and returns the text to print, so the
//! binary stays a thin dispatcher.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Load skills from a JSON file, keeping their ids |
//! | `list` | List skills in store order |
//! | `tiers` | Show tier resolution for a set of active categories |
//! | `merge` | Consolidate two or more skills into one |
//! | `assign-owner` / `remove-owner` | Bulk owner maintenance |
//! | `refresh` | Regenerate skills from their source URLs |
//! | `analyze` | Library health analysis, optionally applying a merge recommendation |
//! | `rename-category` / `remove-category` | Category maintenance |
//!
//! # Example Usage
//!
//! ```bash
//! skillvault import skills.json
//! skillvault tiers --category billing --category security
//! skillvault merge 3f1c 9a2e --as-email ana@example.com
//! skillvault assign-owner --name Ana --email ana@example.com 3f1c 9a2e
//! ```

mod analyze;
mod bulk;
mod categories;
mod library;
mod llm_factory;
mod merge;
mod workspace;

pub use analyze::cmd_analyze;
pub use bulk::{cmd_bulk, render_bulk_outcome};
pub use categories::{cmd_remove_category, cmd_rename_category};
pub use library::{cmd_import, cmd_list, cmd_tiers};
pub use llm_factory::{build_analyzer, build_refresher, build_summarizer};
pub use merge::cmd_merge;
pub use workspace::Workspace;
