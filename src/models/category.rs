//! Category registry.
//!
//! Skills reference categories by name, and the registry order decides which
//! override wins when several of a skill's categories are active at once.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier.
    pub id: String,
    /// Display name; the join key used by skills and overrides.
    pub name: String,
}

impl Category {
    /// Creates a category with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// Ordered list of categories with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Builds a registry from names, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on empty or duplicate names.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.add(name)?;
        }
        Ok(registry)
    }

    /// Appends a category at the end of the order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is empty or already taken.
    pub fn add(&mut self, name: impl Into<String>) -> Result<&Category> {
        let name = name.into();
        self.validate_new_name(&name)?;
        self.categories.push(Category::new(name));
        let last = self.categories.len() - 1;
        Ok(&self.categories[last])
    }

    /// Returns the position of `name` in the registry order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Returns true if a category with `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Looks up a category by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Iterates categories in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Iterates category names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if the registry has no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Renames a category in place, keeping its id and position.
    ///
    /// Skills still reference the old name until they are rekeyed; see
    /// `services::CategoryService::rename`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `old` is unknown and
    /// [`Error::InvalidInput`] if `new` is empty or already taken.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self.position(old).ok_or_else(|| Error::NotFound {
            kind: "category",
            id: old.to_string(),
        })?;
        if old == new {
            return Ok(());
        }
        self.validate_new_name(new)?;
        self.categories[idx].name = new.to_string();
        Ok(())
    }

    /// Removes a category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the category does not exist.
    pub fn remove(&mut self, name: &str) -> Result<Category> {
        let idx = self.position(name).ok_or_else(|| Error::NotFound {
            kind: "category",
            id: name.to_string(),
        })?;
        Ok(self.categories.remove(idx))
    }

    fn validate_new_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "category name must not be empty".to_string(),
            ));
        }
        if self.contains(name) {
            return Err(Error::InvalidInput(format!(
                "category '{name}' already exists"
            )));
        }
        Ok(())
    }
}
