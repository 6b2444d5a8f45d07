//! Shared `SQLite` infrastructure for entry stores.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragma setup
//! - [`metrics`]: storage operation metrics

mod connection;
mod metrics;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::StoreTimer;
