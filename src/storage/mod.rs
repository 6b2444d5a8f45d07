//! Storage layer.
//!
//! The engine talks to storage only through [`EntryStore`]; persistence is an
//! external collaborator and these backends are reference adapters.

pub mod persistence;
pub mod sqlite;
pub mod traits;

pub use persistence::{InMemoryEntryStore, SqliteEntryStore};
pub use traits::EntryStore;
