//! Persistent (immutable) hash set.
//!
//! [`PersistentHashSet`] is a thin wrapper around `PersistentHashMap<T, ()>`.
//! It is what [`PersistentHashMap::key_set`] returns and inherits the map's
//! equality strategy and enumeration order.
//!
//! # Examples
//!
//! ```rust
//! use hamtmap::PersistentHashSet;
//!
//! let set = PersistentHashSet::empty().insert(1).insert(2).insert(3);
//!
//! assert!(set.contains(&1));
//! assert!(!set.contains(&4));
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);      // Original unchanged
//! assert_eq!(updated.len(), 4);  // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;

use super::PersistentHashMap;
use super::hashmap::PersistentHashMapIterator;
use crate::equality::{Equatable, HasEquality};

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on [`PersistentHashMap`].
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> PersistentHashSet<T> {
    /// Returns the empty set.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            inner: PersistentHashMap::EMPTY,
        }
    }

    /// Wraps a map whose values carry no information.
    pub(crate) const fn from_map(inner: PersistentHashMap<T, ()>) -> Self {
        Self { inner }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements in canonical enumeration order.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Equatable> PersistentHashSet<T> {
    /// Returns `true` if the set contains the element.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        self.inner.contains_key(element)
    }
}

impl<T: Equatable + Clone> PersistentHashSet<T> {
    /// Returns a new set that also contains `element`.
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Returns a new set without `element`.
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Clone for PersistentHashSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for PersistentHashSet<T> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Equatable + Clone> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|element| (element, ())).collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Equatable> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.equals(&other.inner)
    }
}

impl<T: Equatable> Eq for PersistentHashSet<T> {}

impl<T: Equatable> HasEquality for PersistentHashSet<T> {
    fn equals(&self, other: &Self) -> bool {
        self.inner.equals(&other.inner)
    }

    fn hash_code(&self) -> u32 {
        self.inner.hash_code()
    }
}

impl<T: Equatable> Equatable for PersistentHashSet<T> {
    fn has_equality(&self) -> bool {
        true
    }

    fn primitive_hash(&self) -> u32 {
        self.hash_code()
    }

    fn primitive_equals(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (index, element) in self.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentHashSet<T>
where
    T: serde::Deserialize<'de> + Equatable + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let elements: Vec<T> = serde::Deserialize::deserialize(deserializer)?;
        Ok(elements.into_iter().collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
