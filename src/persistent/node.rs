//! Trie nodes of the hash array mapped trie.
//!
//! Nodes are immutable once built. Every operation that changes the trie
//! returns freshly allocated nodes along the path from the root to the
//! modification point and shares every untouched sibling by pointer.

use std::borrow::Borrow;

use smallvec::SmallVec;

use super::ReferenceCounter;
use crate::equality::{EqualityStrategy, Equatable};

// =============================================================================
// Constants
// =============================================================================

/// Branching factor (2^5 = 32)
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Bits of the hash consumed per trie level
pub(crate) const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting a chunk within a node
const MASK: u32 = (BRANCHING_FACTOR - 1) as u32;

/// Maximum depth of the trie (32 bits / 5 bits per level, rounded up)
pub(crate) const MAX_DEPTH: usize = 32_usize.div_ceil(BITS_PER_LEVEL);

/// Extracts the chunk of `hash` used at `depth`.
#[inline]
const fn hash_index(hash: u32, depth: usize) -> u32 {
    (hash >> (depth * BITS_PER_LEVEL)) & MASK
}

/// Position of `bit` in a dense children array described by `bitmap`.
#[inline]
const fn position(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Applies the optional merge function to an existing value.
#[inline]
fn resolve<V, F>(existing: &V, value: V, merge: Option<F>) -> V
where
    F: FnOnce(&V, V) -> V,
{
    match merge {
        Some(function) => function(existing, value),
        None => value,
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the HAMT.
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    /// No entries
    Empty,
    /// Single entry with its cached key hash
    Leaf { hash: u32, key: K, value: V },
    /// Two or more entries whose keys share the full hash
    Collision {
        hash: u32,
        entries: ReferenceCounter<[(K, V)]>,
    },
    /// Bitmap-indexed branch; `children.len() == bitmap.count_ones()`
    Branch {
        bitmap: u32,
        children: ReferenceCounter<[ReferenceCounter<Node<K, V>>]>,
    },
}

impl<K, V> Node<K, V> {
    /// Returns `true` for branch nodes, which cannot be lifted to another depth.
    #[inline]
    const fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }

    /// Builds the smallest subtree holding two nodes with different hashes.
    ///
    /// `existing` is shared, not copied; it may be a leaf or a collision node.
    fn join(
        existing: ReferenceCounter<Self>,
        existing_hash: u32,
        added: Self,
        added_hash: u32,
        depth: usize,
    ) -> Self {
        debug_assert_ne!(existing_hash, added_hash);
        debug_assert!(depth < MAX_DEPTH);

        let existing_index = hash_index(existing_hash, depth);
        let added_index = hash_index(added_hash, depth);

        if existing_index == added_index {
            let subnode = Self::join(existing, existing_hash, added, added_hash, depth + 1);
            Self::Branch {
                bitmap: 1 << existing_index,
                children: ReferenceCounter::from(vec![ReferenceCounter::new(subnode)]),
            }
        } else {
            let added = ReferenceCounter::new(added);
            let children = if existing_index < added_index {
                vec![existing, added]
            } else {
                vec![added, existing]
            };
            Self::Branch {
                bitmap: (1 << existing_index) | (1 << added_index),
                children: ReferenceCounter::from(children),
            }
        }
    }

    /// Folds over every entry in canonical enumeration order.
    pub(crate) fn fold<B, F>(&self, init: B, function: &mut F) -> B
    where
        F: FnMut(B, &K, &V) -> B,
    {
        match self {
            Self::Empty => init,
            Self::Leaf { key, value, .. } => function(init, key, value),
            Self::Collision { entries, .. } => entries
                .iter()
                .fold(init, |accumulator, (key, value)| function(accumulator, key, value)),
            Self::Branch { children, .. } => children
                .iter()
                .fold(init, |accumulator, child| child.fold(accumulator, function)),
        }
    }

    /// Rebuilds the same trie shape with every value transformed.
    pub(crate) fn map_values<V2, F>(&self, function: &mut F) -> Node<K, V2>
    where
        K: Clone,
        F: FnMut(&V) -> V2,
    {
        match self {
            Self::Empty => Node::Empty,
            Self::Leaf { hash, key, value } => Node::Leaf {
                hash: *hash,
                key: key.clone(),
                value: function(value),
            },
            Self::Collision { hash, entries } => Node::Collision {
                hash: *hash,
                entries: entries
                    .iter()
                    .map(|(key, value)| (key.clone(), function(value)))
                    .collect(),
            },
            Self::Branch { bitmap, children } => Node::Branch {
                bitmap: *bitmap,
                children: children
                    .iter()
                    .map(|child| ReferenceCounter::new(child.map_values(function)))
                    .collect(),
            },
        }
    }
}

impl<K: Equatable, V> Node<K, V> {
    /// Looks up the entry stored under `key`.
    pub(crate) fn get<Q>(
        &self,
        hash: u32,
        key: &Q,
        depth: usize,
        strategy: EqualityStrategy,
    ) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        match self {
            Self::Empty => None,
            Self::Leaf {
                hash: leaf_hash,
                key: leaf_key,
                value,
            } => (*leaf_hash == hash && strategy.equals(leaf_key.borrow(), key))
                .then_some((leaf_key, value)),
            Self::Collision {
                hash: collision_hash,
                entries,
            } => {
                if *collision_hash != hash {
                    return None;
                }
                entries
                    .iter()
                    .find(|(entry_key, _)| strategy.equals(entry_key.borrow(), key))
                    .map(|(entry_key, value)| (entry_key, value))
            }
            Self::Branch { bitmap, children } => {
                let bit: u32 = 1 << hash_index(hash, depth);
                if bitmap & bit == 0 {
                    None
                } else {
                    children[position(*bitmap, bit)].get(hash, key, depth + 1, strategy)
                }
            }
        }
    }
}

impl<K: Equatable + Clone, V: Clone> Node<K, V> {
    /// Inserts or updates `key`, returning the new node and whether the key was new.
    ///
    /// When `merge` is given and the key already exists, the stored value
    /// becomes `merge(existing, value)`.
    pub(crate) fn insert<F>(
        node: &ReferenceCounter<Self>,
        hash: u32,
        key: K,
        value: V,
        depth: usize,
        strategy: EqualityStrategy,
        merge: Option<F>,
    ) -> (Self, bool)
    where
        F: FnOnce(&V, V) -> V,
    {
        match &**node {
            Self::Empty => (Self::Leaf { hash, key, value }, true),
            Self::Leaf {
                hash: leaf_hash,
                key: leaf_key,
                value: leaf_value,
            } => {
                if *leaf_hash != hash {
                    let added = Self::Leaf { hash, key, value };
                    let shared = ReferenceCounter::clone(node);
                    (Self::join(shared, *leaf_hash, added, hash, depth), true)
                } else if strategy.equals(leaf_key, &key) {
                    let value = resolve(leaf_value, value, merge);
                    (Self::Leaf { hash, key, value }, false)
                } else {
                    let entries = vec![(leaf_key.clone(), leaf_value.clone()), (key, value)];
                    (
                        Self::Collision {
                            hash,
                            entries: ReferenceCounter::from(entries),
                        },
                        true,
                    )
                }
            }
            Self::Collision {
                hash: collision_hash,
                entries,
            } => {
                if *collision_hash != hash {
                    let added = Self::Leaf { hash, key, value };
                    let shared = ReferenceCounter::clone(node);
                    return (Self::join(shared, *collision_hash, added, hash, depth), true);
                }

                let mut new_entries = entries.to_vec();
                let found = new_entries
                    .iter()
                    .position(|(entry_key, _)| strategy.equals(entry_key, &key));
                match found {
                    Some(index) => {
                        let value = resolve(&new_entries[index].1, value, merge);
                        new_entries[index] = (key, value);
                    }
                    None => new_entries.push((key, value)),
                }
                (
                    Self::Collision {
                        hash,
                        entries: ReferenceCounter::from(new_entries),
                    },
                    found.is_none(),
                )
            }
            Self::Branch { bitmap, children } => {
                let bit: u32 = 1 << hash_index(hash, depth);
                let index = position(*bitmap, bit);
                let mut new_children = children.to_vec();

                let added = if bitmap & bit == 0 {
                    let leaf = ReferenceCounter::new(Self::Leaf { hash, key, value });
                    new_children.insert(index, leaf);
                    true
                } else {
                    let (child, added) = Self::insert(
                        &children[index],
                        hash,
                        key,
                        value,
                        depth + 1,
                        strategy,
                        merge,
                    );
                    new_children[index] = ReferenceCounter::new(child);
                    added
                };

                (
                    Self::Branch {
                        bitmap: bitmap | bit,
                        children: ReferenceCounter::from(new_children),
                    },
                    added,
                )
            }
        }
    }

    /// Removes `key`, returning `None` when the key is absent.
    ///
    /// Single-entry collisions collapse to leaves and branches left with one
    /// leaf or collision child collapse to that child.
    pub(crate) fn delete<Q>(
        node: &ReferenceCounter<Self>,
        hash: u32,
        key: &Q,
        depth: usize,
        strategy: EqualityStrategy,
    ) -> Option<ReferenceCounter<Self>>
    where
        K: Borrow<Q>,
        Q: Equatable + ?Sized,
    {
        match &**node {
            Self::Empty => None,
            Self::Leaf {
                hash: leaf_hash,
                key: leaf_key,
                ..
            } => (*leaf_hash == hash && strategy.equals(leaf_key.borrow(), key))
                .then(|| ReferenceCounter::new(Self::Empty)),
            Self::Collision {
                hash: collision_hash,
                entries,
            } => {
                if *collision_hash != hash {
                    return None;
                }
                let index = entries
                    .iter()
                    .position(|(entry_key, _)| strategy.equals(entry_key.borrow(), key))?;

                let mut remaining = entries.to_vec();
                remaining.remove(index);
                let collapsed = if remaining.len() == 1 {
                    let (key, value) = remaining.remove(0);
                    Self::Leaf { hash, key, value }
                } else {
                    Self::Collision {
                        hash,
                        entries: ReferenceCounter::from(remaining),
                    }
                };
                Some(ReferenceCounter::new(collapsed))
            }
            Self::Branch { bitmap, children } => {
                let bit: u32 = 1 << hash_index(hash, depth);
                if bitmap & bit == 0 {
                    return None;
                }
                let index = position(*bitmap, bit);
                let child = Self::delete(&children[index], hash, key, depth + 1, strategy)?;

                let mut new_children = children.to_vec();
                let new_bitmap = if matches!(*child, Self::Empty) {
                    new_children.remove(index);
                    bitmap & !bit
                } else {
                    new_children[index] = child;
                    *bitmap
                };

                if new_children.is_empty() {
                    return Some(ReferenceCounter::new(Self::Empty));
                }
                if new_children.len() == 1 && !new_children[0].is_branch() {
                    return new_children.pop();
                }
                Some(ReferenceCounter::new(Self::Branch {
                    bitmap: new_bitmap,
                    children: ReferenceCounter::from(new_children),
                }))
            }
        }
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Borrowing iterator over the entries below a node, in canonical order.
pub(crate) struct Entries<'a, K, V> {
    stack: SmallVec<[&'a [ReferenceCounter<Node<K, V>>]; MAX_DEPTH + 1]>,
    collision: std::slice::Iter<'a, (K, V)>,
}

impl<'a, K, V> Entries<'a, K, V> {
    pub(crate) fn new(root: Option<&'a ReferenceCounter<Node<K, V>>>) -> Self {
        let mut stack = SmallVec::new();
        if let Some(root) = root {
            stack.push(std::slice::from_ref(root));
        }
        Self {
            stack,
            collision: Default::default(),
        }
    }
}

impl<'a, K, V> Iterator for Entries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.collision.next() {
                return Some((key, value));
            }

            let top = self.stack.last_mut()?;
            let current: &'a [ReferenceCounter<Node<K, V>>] = *top;
            let Some((first, rest)) = current.split_first() else {
                self.stack.pop();
                continue;
            };
            *top = rest;

            match &**first {
                Node::Empty => {}
                Node::Leaf { key, value, .. } => return Some((key, value)),
                Node::Collision { entries, .. } => self.collision = entries.iter(),
                Node::Branch { children, .. } => self.stack.push(children),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
