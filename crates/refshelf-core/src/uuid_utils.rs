//! UUID v7 utilities for time-ordered identifiers.
//!
//! References, keywords and orphan log entries use UUIDv7 ids, which embed
//! a millisecond timestamp in their first 48 bits so ids sort by creation.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use refshelf_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
