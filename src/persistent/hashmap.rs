//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! `PersistentHashMap` is based on Hash Array Mapped Trie (HAMT), a data structure
//! that provides efficient immutable operations. It uses a 32-way branching trie
//! where 5-bit chunks of a 32-bit key hash are used to navigate the tree.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Equality strategies
//!
//! Every map starts from [`PersistentHashMap::EMPTY`], which has no
//! [`EqualityStrategy`]. The first insertion inspects the key: keys exposing a
//! custom [`HasEquality`](crate::HasEquality) capability bind the structural
//! strategy, all others the primitive one. Every map derived from that one
//! keeps the same strategy.
//!
//! # Examples
//!
//! ```rust
//! use hamtmap::PersistentHashMap;
//!
//! let map = PersistentHashMap::empty()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;

use super::node::{Entries, Node};
use super::{PersistentHashSet, ReferenceCounter};
use crate::equality::{EqualityStrategy, Equatable};
use crate::error::MapError;

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// `PersistentHashMap` is an immutable data structure that uses structural
/// sharing to efficiently support functional programming patterns.
///
/// # Time Complexity
///
/// | Operation           | Complexity        |
/// |---------------------|-------------------|
/// | `empty`             | O(1)              |
/// | `get`               | O(log32 N)        |
/// | `insert`            | O(log32 N)        |
/// | `insert_with_merge` | O(log32 N)        |
/// | `remove`            | O(log32 N)        |
/// | `len`               | O(1)              |
/// | `map_values`        | O(N)              |
/// | `map_entries`       | O(N log32 N)      |
///
/// # Examples
///
/// ```rust
/// use hamtmap::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
pub struct PersistentHashMap<K, V> {
    /// Root node of the trie; `None` exactly when the map has no entries
    root: Option<ReferenceCounter<Node<K, V>>>,
    /// Number of entries
    length: usize,
    /// Strategy bound at the first insertion of this lineage
    strategy: Option<EqualityStrategy>,
}

impl<K, V> PersistentHashMap<K, V> {
    /// The shared empty map.
    ///
    /// It owns no allocation and has no bound [`EqualityStrategy`]; the first
    /// insertion into it selects one from the inserted key.
    pub const EMPTY: Self = Self {
        root: None,
        length: 0,
        strategy: None,
    };

    /// Returns the empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::empty();
    /// assert!(map.is_empty());
    /// assert_eq!(map.strategy(), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::EMPTY
    }

    /// Creates a new empty map. Same as [`PersistentHashMap::empty`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// assert_eq!(map.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the strategy bound to this map's lineage, if any key was ever inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::{EqualityStrategy, PersistentHashMap};
    ///
    /// let map = PersistentHashMap::empty().insert(1, "a");
    /// assert_eq!(map.strategy(), Some(EqualityStrategy::Primitive));
    ///
    /// // Removing every entry keeps the binding.
    /// assert_eq!(map.remove(&1).strategy(), Some(EqualityStrategy::Primitive));
    /// ```
    #[inline]
    #[must_use]
    pub const fn strategy(&self) -> Option<EqualityStrategy> {
        self.strategy
    }

    /// Returns an iterator over key-value pairs in canonical enumeration order.
    ///
    /// The order follows the trie layout (hash chunks), not insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(sum, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            entries: Entries::new(self.root.as_ref()),
            remaining: self.length,
        }
    }

    /// Returns an iterator over keys in canonical enumeration order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in canonical enumeration order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Folds over every entry in canonical enumeration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert(1, 10).insert(2, 20);
    /// let total = map.fold(0, |accumulator, key, value| accumulator + key + value);
    /// assert_eq!(total, 33);
    /// ```
    pub fn fold<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(B, &K, &V) -> B,
    {
        match &self.root {
            None => init,
            Some(root) => root.fold(init, &mut function),
        }
    }
}

impl<K: Equatable, V> PersistentHashMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but its
    /// [`Equatable`] implementation must agree with the key type's.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and its value.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        let root = self.root.as_ref()?;
        let strategy = self.strategy?;
        root.get(strategy.hash(key), key, 0, strategy)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Returns the value for `key`, or [`MapError::KeyNotFound`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if the key is not in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert(1, "one");
    /// assert_eq!(map.get_or_error(&1), Ok(&"one"));
    /// assert!(map.get_or_error(&2).is_err());
    /// ```
    pub fn get_or_error<Q>(&self, key: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: Equatable + fmt::Debug + ?Sized,
    {
        self.get(key).ok_or_else(|| MapError::key_not_found(key))
    }
}

impl<K: Equatable + Clone, V: Clone> PersistentHashMap<K, V> {
    /// Creates a map containing a single key-value pair.
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::EMPTY.insert(key, value)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced and the
    /// length is unchanged.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::empty().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// assert_eq!(map2.len(), 1);
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.insert_entry(key, value, None::<fn(&V, V) -> V>)
    }

    /// Inserts a key-value pair, merging with the existing value on a key collision.
    ///
    /// `merge(existing, value)` is only invoked when the key is already
    /// present; a fresh key is inserted as is.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty()
    ///     .insert("k".to_string(), 1)
    ///     .insert_with_merge("k".to_string(), 2, |existing, value| existing + value);
    ///
    /// assert_eq!(map.get("k"), Some(&3));
    /// assert_eq!(map.len(), 1);
    /// ```
    #[must_use]
    pub fn insert_with_merge<F>(&self, key: K, value: V, merge: F) -> Self
    where
        F: FnOnce(&V, V) -> V,
    {
        self.insert_entry(key, value, Some(merge))
    }

    fn insert_entry<F>(&self, key: K, value: V, merge: Option<F>) -> Self
    where
        F: FnOnce(&V, V) -> V,
    {
        let strategy = self.strategy.unwrap_or_else(|| {
            let strategy = EqualityStrategy::for_key(&key);
            tracing::trace!(?strategy, "binding equality strategy on first insertion");
            strategy
        });
        let hash = strategy.hash(&key);

        let (root, added) = match &self.root {
            None => (Node::Leaf { hash, key, value }, true),
            Some(root) => Node::insert(root, hash, key, value, 0, strategy, merge),
        };

        Self {
            root: Some(ReferenceCounter::new(root)),
            length: if added { self.length + 1 } else { self.length },
            strategy: Some(strategy),
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key doesn't exist,
    /// returns a clone sharing the original trie.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        let (Some(root), Some(strategy)) = (&self.root, self.strategy) else {
            return self.clone();
        };

        match Node::delete(root, strategy.hash(key), key, 0, strategy) {
            None => self.clone(),
            Some(new_root) => Self {
                root: (!matches!(*new_root, Node::Empty)).then_some(new_root),
                length: self.length - 1,
                strategy: self.strategy,
            },
        }
    }

    /// Returns the set of keys, in canonical enumeration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
    /// let keys = map.key_set();
    ///
    /// assert_eq!(keys.len(), 2);
    /// assert!(keys.contains(&"a"));
    /// assert!(keys.contains(&"b"));
    /// ```
    #[must_use]
    pub fn key_set(&self) -> PersistentHashSet<K> {
        PersistentHashSet::from_map(self.map_values(|_| ()))
    }

    /// Transforms every entry and rebuilds a fresh map from the results.
    ///
    /// Entries are visited in canonical enumeration order and inserted one by
    /// one, so when two transformed keys coincide the later one wins. The
    /// result may therefore be smaller than `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert(1, "a").insert(2, "b");
    ///
    /// let swapped = map.map_entries(|key, value| (value.to_string(), *key));
    /// assert_eq!(swapped.get("a"), Some(&1));
    ///
    /// let collapsed = map.map_entries(|_, value| (0, *value));
    /// assert_eq!(collapsed.len(), 1);
    /// ```
    #[must_use]
    pub fn map_entries<K2, V2, F>(&self, mut function: F) -> PersistentHashMap<K2, V2>
    where
        K2: Equatable + Clone,
        V2: Clone,
        F: FnMut(&K, &V) -> (K2, V2),
    {
        tracing::trace!(length = self.length, "rebuilding map from transformed entries");
        self.fold(PersistentHashMap::EMPTY, |accumulator, key, value| {
            let (new_key, new_value) = function(key, value);
            accumulator.insert(new_key, new_value)
        })
    }
}

impl<K: Clone, V> PersistentHashMap<K, V> {
    /// Transforms every value, keeping keys, strategy and length.
    ///
    /// The trie shape is reused, so no key is rehashed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
    /// let doubled = map.map_values(|value| value * 2);
    ///
    /// assert_eq!(doubled.len(), map.len());
    /// assert_eq!(doubled.get(&"b"), Some(&4));
    /// ```
    #[must_use]
    pub fn map_values<V2, F>(&self, mut function: F) -> PersistentHashMap<K, V2>
    where
        F: FnMut(&V) -> V2,
    {
        PersistentHashMap {
            root: self
                .root
                .as_ref()
                .map(|root| ReferenceCounter::new(root.map_values(&mut function))),
            length: self.length,
            strategy: self.strategy,
        }
    }
}

impl<K: Equatable + Clone, T: Clone> PersistentHashMap<K, Vec<T>> {
    /// Groups `items` into sequences keyed by `key_function`.
    ///
    /// Items keep their relative order inside each group.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::PersistentHashMap;
    ///
    /// let grouped = PersistentHashMap::group_by(vec![1, 2, 3, 4], |value| value % 2);
    ///
    /// assert_eq!(grouped.get(&0), Some(&vec![2, 4]));
    /// assert_eq!(grouped.get(&1), Some(&vec![1, 3]));
    /// ```
    #[must_use]
    pub fn group_by<I, F>(items: I, mut key_function: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> K,
    {
        let items = items.into_iter();
        tracing::trace!(hint = items.size_hint().0, "grouping items by key");
        items.fold(Self::EMPTY, |grouped, item| {
            let key = key_function(&item);
            grouped.insert_with_merge(key, vec![item], |existing, mut added| {
                let mut group = existing.clone();
                group.append(&mut added);
                group
            })
        })
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    entries: Entries<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// An owning iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Clone for PersistentHashMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            strategy: self.strategy,
        }
    }
}

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<K: Equatable + Clone, V: Clone> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |map, (key, value)| map.insert(key, value))
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentHashMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

/// Renders `{key => value, ...}` in canonical enumeration order.
///
/// The format is meant for diagnostics and is not parseable.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key} => {value}")?;
        }
        write!(formatter, "}}")
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentHashMap<String, i32>: Send, Sync);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentHashMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<K, V> PersistentHashMapVisitor<K, V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Equatable + Clone,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentHashMap::EMPTY;
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Equatable + Clone,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================
