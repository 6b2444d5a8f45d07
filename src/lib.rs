//! # Skillvault
//!
//! Tiering and consolidation engine for curated knowledge libraries.
//!
//! Operators curate "skills" (structured knowledge snippets) and select
//! subsets of them as context for an AI answer feature. Skillvault decides
//! which entries fit into a bounded context budget and keeps the library
//! lean by merging redundant entries without losing their provenance.
//!
//! ## Features
//!
//! - Three-tier progressive disclosure (Core, Extended, Library) with
//!   per-category overrides resolved in registry order
//! - Provenance-preserving merges (tags, source URLs, owners, history)
//! - LLM-assisted merge content with a deterministic fallback
//! - Ownership-filtered bulk operations with per-item accounting
//! - Pluggable entry stores (in-memory, `SQLite`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use skillvault::services::{TierResolver, ProvenanceMerger, NoopSummarizer};
//! use skillvault::models::CategoryRegistry;
//!
//! let registry = CategoryRegistry::from_names(["Security", "Billing"])?;
//! let groups = TierResolver::new(&registry).resolve(&skills, &active);
//! println!("{} core entries", groups.core.len());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;

pub use config::SkillVaultConfig;
pub use models::{
    ActingUser, Category, CategoryRegistry, HistoryAction, HistoryEntry, Owner, Skill, SkillId,
    SkillPatch, SourceUrl, Tier, TierGroups,
};
pub use services::{
    BulkOperation, BulkOutcome, BulkRunner, ConsolidationOrchestrator, LibraryState, MergeDraft,
    ProvenanceMerger, TierResolver,
};
pub use storage::{EntryStore, InMemoryEntryStore, SqliteEntryStore};

/// Error type for skillvault operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Merge with fewer than two entries, draft still generating, bad category rename |
/// | `NotFound` | An id is missing from the entry store or library state |
/// | `OperationFailed` | Entry store writes/deletes fail, config or log files cannot be read |
/// | `Collaborator` | Summarizer, refresher, or analyzer calls fail when invoked directly |
/// | `Unauthorized` | `ensure_can_edit` rejects the acting user |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised before any side effect takes place.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity (skill, category, recommendation).
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - Filesystem I/O errors occur
    /// - Observability cannot be initialized
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An external collaborator (LLM, source fetch) failed.
    #[error("{collaborator} failed: {cause}")]
    Collaborator {
        /// The collaborator that failed.
        collaborator: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// The acting user may not mutate the entry.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Result type alias for skillvault operations.
pub type Result<T> = std::result::Result<T, Error>;
