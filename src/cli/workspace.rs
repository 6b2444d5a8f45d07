//! Store and registry wiring shared by every command.

use crate::Result;
use crate::config::SkillVaultConfig;
use crate::models::{CategoryRegistry, Skill, SkillId};
use crate::storage::{EntryStore, InMemoryEntryStore, SqliteEntryStore};
use std::sync::Arc;

/// Everything a command needs: configuration, the entry store and the
/// category registry.
pub struct Workspace {
    config: SkillVaultConfig,
    store: Arc<dyn EntryStore>,
    registry: CategoryRegistry,
}

impl Workspace {
    /// Opens the configured store. Falls back to an in-memory store when no
    /// database path can be determined.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the configured
    /// categories are invalid.
    pub fn open(config: SkillVaultConfig) -> Result<Self> {
        let store: Arc<dyn EntryStore> = match config.effective_db_path() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Opening SQLite entry store");
                Arc::new(SqliteEntryStore::new(path)?)
            },
            None => {
                tracing::warn!("No data directory found; using an in-memory store");
                Arc::new(InMemoryEntryStore::new())
            },
        };
        Self::with_store(config, store)
    }

    /// Builds a workspace over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured categories contain duplicates or
    /// blank names.
    pub fn with_store(config: SkillVaultConfig, store: Arc<dyn EntryStore>) -> Result<Self> {
        let registry = CategoryRegistry::from_names(config.categories.iter().cloned())?;
        Ok(Self {
            config,
            store,
            registry,
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &SkillVaultConfig {
        &self.config
    }

    /// Shared handle to the entry store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn EntryStore> {
        Arc::clone(&self.store)
    }

    /// Category registry in priority order.
    #[must_use]
    pub const fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Mutable registry, for rename and remove.
    pub fn registry_mut(&mut self) -> &mut CategoryRegistry {
        &mut self.registry
    }

    /// Loads the skills named by `ids`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for the first unknown id.
    pub fn load_skills(&self, ids: &[SkillId]) -> Result<Vec<Skill>> {
        ids.iter().map(|id| self.store.require(id)).collect()
    }
}
