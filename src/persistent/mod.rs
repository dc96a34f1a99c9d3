//! Persistent (immutable) hash map and the set built on it.
//!
//! - [`PersistentHashMap`]: Persistent hash map (HAMT)
//! - [`PersistentHashSet`]: Persistent hash set (keys of a `PersistentHashMap`)
//! - [`equals`], [`hash_code`], [`merge_with`]: whole-map operations
//!
//! # Structural Sharing
//!
//! Every operation that would change a map returns a new map instead. The new
//! map allocates only the nodes on the path to the change and shares every
//! other subtree with the map it was derived from.
//!
//! ```rust
//! use hamtmap::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::empty()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//! assert_eq!(map.get("one"), Some(&1));
//!
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (the default), this is `std::sync::Arc`,
/// which lets map values cross thread boundaries.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod hashmap;
mod hashset;
mod node;
mod operations;

pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIterator;
pub use operations::{equals, hash_code, merge_with};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_strong_count() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 2);
        drop(reference_counter_clone);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
    }
}
