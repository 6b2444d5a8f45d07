//! Entry store backends.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`InMemoryEntryStore`] | Tests, ephemeral CLI sessions |
//! | [`SqliteEntryStore`] | Durable single-file storage |

mod memory;
mod sqlite;

pub use memory::InMemoryEntryStore;
pub use sqlite::SqliteEntryStore;
