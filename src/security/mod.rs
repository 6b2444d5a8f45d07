//! Security features.
//!
//! Ownership-based edit authorization for single and bulk mutations.

mod ownership;

pub use ownership::{EditAccess, can_edit, check_edit_access, ensure_can_edit, filter_editable};
