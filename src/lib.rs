//! # hamtmap
//!
//! A persistent (immutable, structurally shared) hash map built on a hash
//! array mapped trie, with pluggable key equality.
//!
//! ## Overview
//!
//! - **Persistent map**: [`PersistentHashMap`], where every insert, merge or
//!   removal returns a new map and leaves earlier versions untouched.
//! - **Equality strategies**: the first key inserted into an empty map decides
//!   whether keys are compared through their own [`HasEquality`] capability
//!   (structural) or by value (primitive). See [`equality`].
//! - **Whole-map operations**: order-independent equality and hashing, and
//!   conflict-resolving merges. See [`persistent::merge_with`].
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so maps are `Send + Sync`
//! - `serde`: `Serialize`/`Deserialize` for maps and sets
//! - `fxhash`: hash primitive keys with `FxHasher` instead of `DefaultHasher`
//!
//! ## Example
//!
//! ```rust
//! use hamtmap::PersistentHashMap;
//!
//! let left = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
//! let right = PersistentHashMap::empty().insert("b", 20).insert("c", 3);
//!
//! let merged = left.merge_with(&right, |existing, incoming| existing + incoming);
//! let expected = PersistentHashMap::empty()
//!     .insert("a", 1)
//!     .insert("b", 22)
//!     .insert("c", 3);
//!
//! assert_eq!(merged, expected);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod equality;
pub mod error;
pub mod persistent;

pub use equality::{EqualityStrategy, Equatable, HasEquality, primitive_hash};
pub use error::MapError;
pub use persistent::{PersistentHashMap, PersistentHashSet};

/// Prelude module for convenient imports.
///
/// ```rust
/// use hamtmap::prelude::*;
///
/// let map = PersistentHashMap::empty().insert(1, "one");
/// assert_eq!(map.strategy(), Some(EqualityStrategy::Primitive));
/// ```
pub mod prelude {
    pub use crate::equality::{EqualityStrategy, Equatable, HasEquality};
    pub use crate::error::MapError;
    pub use crate::persistent::*;
}
