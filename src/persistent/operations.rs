//! Whole-map algorithms: structural equality, hashing and merging.
//!
//! These are the operations that look at two maps (or at every entry of one)
//! at once. They are exposed both as free functions and through the standard
//! traits ([`PartialEq`], [`Hash`]) and [`HasEquality`], so maps can be nested
//! as keys or values of other maps.

use std::hash::{Hash, Hasher};

use super::PersistentHashMap;
use crate::equality::{Equatable, HasEquality, equals_of, hash_of};

/// Returns `true` if both maps hold the same keys with equal values.
///
/// Values are compared with their own strategy (structural when they expose a
/// [`HasEquality`] capability, primitive otherwise). Two maps without entries
/// are always equal, whether or not a strategy was ever bound to them.
///
/// # Examples
///
/// ```rust
/// use hamtmap::{PersistentHashMap, persistent::equals};
///
/// let left = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
/// let right = PersistentHashMap::empty().insert("b", 2).insert("a", 1);
/// assert!(equals(&left, &right));
///
/// let emptied = PersistentHashMap::empty().insert("a", 1).remove(&"a");
/// assert!(equals(&PersistentHashMap::empty(), &emptied));
/// ```
pub fn equals<K, V>(left: &PersistentHashMap<K, V>, right: &PersistentHashMap<K, V>) -> bool
where
    K: Equatable,
    V: Equatable,
{
    if left.is_empty() && right.is_empty() {
        return true;
    }
    if left.len() != right.len() {
        return false;
    }
    left.iter().all(|(key, value)| {
        right
            .get(key)
            .is_some_and(|other_value| equals_of(value, other_value))
    })
}

/// Order-independent hash of a whole map.
///
/// The sum (wrapping) over entries of `hash(key) + hash(value)`, so equal maps
/// hash equally regardless of their trie layout. The sum is weak against
/// entry sets that redistribute the same total and is only suitable for
/// bucket placement, not for content addressing.
///
/// # Examples
///
/// ```rust
/// use hamtmap::{PersistentHashMap, persistent::hash_code};
///
/// let empty: PersistentHashMap<i32, i32> = PersistentHashMap::empty();
/// assert_eq!(hash_code(&empty), 0);
///
/// let left = PersistentHashMap::empty().insert(1, 10).insert(2, 20);
/// let right = PersistentHashMap::empty().insert(2, 20).insert(1, 10);
/// assert_eq!(hash_code(&left), hash_code(&right));
/// ```
pub fn hash_code<K, V>(map: &PersistentHashMap<K, V>) -> u32
where
    K: Equatable,
    V: Equatable,
{
    map.fold(0_u32, |accumulator, key, value| {
        accumulator
            .wrapping_add(hash_of(key))
            .wrapping_add(hash_of(value))
    })
}

/// Merges `right` into `left`, combining values of keys present in both.
///
/// Starting from `left`, every entry of `right` is inserted; when the key
/// already exists, `merge(existing, incoming)` becomes the value. `merge` runs
/// exactly once per overlapping key and never for keys only one side has.
///
/// # Examples
///
/// ```rust
/// use hamtmap::{PersistentHashMap, persistent::merge_with};
///
/// let left = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
/// let right = PersistentHashMap::empty().insert("b", 20).insert("c", 3);
///
/// let merged = merge_with(&left, &right, |existing, incoming| existing + incoming);
/// assert_eq!(merged.get(&"a"), Some(&1));
/// assert_eq!(merged.get(&"b"), Some(&22));
/// assert_eq!(merged.get(&"c"), Some(&3));
/// ```
pub fn merge_with<K, V, F>(
    left: &PersistentHashMap<K, V>,
    right: &PersistentHashMap<K, V>,
    mut merge: F,
) -> PersistentHashMap<K, V>
where
    K: Equatable + Clone,
    V: Clone,
    F: FnMut(&V, V) -> V,
{
    if left.is_empty() {
        return right.clone();
    }
    if right.is_empty() {
        return left.clone();
    }

    tracing::trace!(
        left = left.len(),
        right = right.len(),
        "merging maps entry by entry"
    );
    right.fold(left.clone(), |merged, key, value| {
        merged.insert_with_merge(key.clone(), value.clone(), &mut merge)
    })
}

impl<K: Equatable + Clone, V: Clone> PersistentHashMap<K, V> {
    /// Merges `other` into `self`. See [`merge_with`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let counts = PersistentHashMap::empty().insert("x", 1);
    /// let more = PersistentHashMap::empty().insert("x", 2).insert("y", 5);
    ///
    /// let total = counts.merge_with(&more, |existing, incoming| existing + incoming);
    /// assert_eq!(total.get(&"x"), Some(&3));
    /// assert_eq!(total.get(&"y"), Some(&5));
    /// ```
    #[must_use]
    pub fn merge_with<F>(&self, other: &Self, merge: F) -> Self
    where
        F: FnMut(&V, V) -> V,
    {
        merge_with(self, other, merge)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K: Equatable, V: Equatable> HasEquality for PersistentHashMap<K, V> {
    fn equals(&self, other: &Self) -> bool {
        equals(self, other)
    }

    fn hash_code(&self) -> u32 {
        hash_code(self)
    }
}

impl<K: Equatable, V: Equatable> Equatable for PersistentHashMap<K, V> {
    fn has_equality(&self) -> bool {
        true
    }

    fn primitive_hash(&self) -> u32 {
        hash_code(self)
    }

    fn primitive_equals(&self, other: &Self) -> bool {
        equals(self, other)
    }
}

impl<K: Equatable, V: Equatable> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        equals(self, other)
    }
}

impl<K: Equatable, V: Equatable> Eq for PersistentHashMap<K, V> {}

impl<K: Equatable, V: Equatable> Hash for PersistentHashMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(hash_code(self));
    }
}

// =============================================================================
// Tests
// =============================================================================
