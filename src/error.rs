//! Error types for fallible map accessors.

use thiserror::Error;

/// Errors returned by the `Result`-based accessors of the persistent map.
///
/// Plain lookups never fail; they return `None` for a missing key. This type
/// exists for callers that want a missing key to propagate with `?`.
///
/// # Examples
///
/// ```rust
/// use hamtmap::{MapError, PersistentHashMap};
///
/// let map = PersistentHashMap::empty().insert("a", 1);
/// assert_eq!(map.get_or_error(&"a"), Ok(&1));
/// assert_eq!(
///     map.get_or_error(&"b"),
///     Err(MapError::KeyNotFound { key: "\"b\"".to_string() })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The requested key is not present in the map.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// Debug rendering of the missing key.
        key: String,
    },
}

impl MapError {
    /// Creates a [`MapError::KeyNotFound`] from any debuggable key.
    pub fn key_not_found<Q: std::fmt::Debug + ?Sized>(key: &Q) -> Self {
        Self::KeyNotFound {
            key: format!("{key:?}"),
        }
    }
}
