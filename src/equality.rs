//! Key equality and hashing strategies.
//!
//! A map decides once, at its first insertion, how its keys are hashed and
//! compared. Keys that carry their own [`HasEquality`] capability bind the
//! [`EqualityStrategy::Structural`] strategy; everything else binds
//! [`EqualityStrategy::Primitive`], which hashes the intrinsic value through
//! [`std::hash::Hash`] and compares with [`Eq`].
//!
//! # Examples
//!
//! ```rust
//! use hamtmap::{EqualityStrategy, HasEquality, structural_key};
//!
//! #[derive(Clone, Debug)]
//! struct CaseInsensitive(String);
//!
//! impl HasEquality for CaseInsensitive {
//!     fn equals(&self, other: &Self) -> bool {
//!         self.0.eq_ignore_ascii_case(&other.0)
//!     }
//!
//!     fn hash_code(&self) -> u32 {
//!         hamtmap::primitive_hash(&self.0.to_ascii_lowercase())
//!     }
//! }
//!
//! structural_key!(CaseInsensitive);
//!
//! let key = CaseInsensitive("Key".to_string());
//! assert_eq!(EqualityStrategy::for_key(&key), EqualityStrategy::Structural);
//! assert_eq!(EqualityStrategy::for_key(&42), EqualityStrategy::Primitive);
//! ```
//!
//! # Mixing key families
//!
//! Every key inserted into one map lineage must be compatible with the strategy
//! bound at its first insertion. This is not checked: a lineage that mixes
//! keys with and without a custom capability gives unspecified lookup results.

#[cfg(not(feature = "fxhash"))]
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[cfg(feature = "fxhash")]
use rustc_hash::FxHasher;

// =============================================================================
// Capability Traits
// =============================================================================

/// A custom hash/equality capability exposed by a key or value type.
///
/// Implementations must keep `a.equals(b) => a.hash_code() == b.hash_code()`.
pub trait HasEquality {
    /// Returns `true` if `self` and `other` are equal under this capability.
    fn equals(&self, other: &Self) -> bool;

    /// Returns the hash of `self` under this capability.
    fn hash_code(&self) -> u32;
}

/// Types that can be used as map keys or compared as map values.
///
/// The map only ever calls the pair of methods that belongs to its bound
/// [`EqualityStrategy`]. Primitive types implement the `primitive_*` pair and
/// report no custom capability; types with a [`HasEquality`] impl report one
/// and route both pairs through it (see [`structural_key!`](crate::structural_key)).
pub trait Equatable {
    /// Probes whether this value exposes a custom [`HasEquality`] capability.
    fn has_equality(&self) -> bool {
        false
    }

    /// Hash of the intrinsic value.
    fn primitive_hash(&self) -> u32;

    /// Built-in value equality.
    fn primitive_equals(&self, other: &Self) -> bool;

    /// Hash through the custom capability; defaults to the primitive hash.
    fn structural_hash(&self) -> u32 {
        self.primitive_hash()
    }

    /// Equality through the custom capability; defaults to primitive equality.
    fn structural_equals(&self, other: &Self) -> bool {
        self.primitive_equals(other)
    }
}

// =============================================================================
// EqualityStrategy
// =============================================================================

/// The pair of hash/equals functions bound to a map lineage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EqualityStrategy {
    /// Hash and equality come from the key's own [`HasEquality`] capability.
    Structural,
    /// Hash and equality come from the key's intrinsic value.
    Primitive,
}

impl EqualityStrategy {
    /// Selects the strategy for a map whose first key is `key`.
    #[inline]
    #[must_use]
    pub fn for_key<K: Equatable + ?Sized>(key: &K) -> Self {
        if key.has_equality() {
            Self::Structural
        } else {
            Self::Primitive
        }
    }

    /// Hashes `key` under this strategy.
    #[inline]
    #[must_use]
    pub fn hash<K: Equatable + ?Sized>(self, key: &K) -> u32 {
        match self {
            Self::Structural => key.structural_hash(),
            Self::Primitive => key.primitive_hash(),
        }
    }

    /// Compares two keys under this strategy.
    #[inline]
    #[must_use]
    pub fn equals<K: Equatable + ?Sized>(self, left: &K, right: &K) -> bool {
        match self {
            Self::Structural => left.structural_equals(right),
            Self::Primitive => left.primitive_equals(right),
        }
    }
}

/// Hashes a value with the strategy its own capabilities select.
///
/// Used for map values, which are not bound to a lineage strategy.
#[inline]
#[must_use]
pub fn hash_of<T: Equatable + ?Sized>(value: &T) -> u32 {
    EqualityStrategy::for_key(value).hash(value)
}

/// Compares two values with the strategy the left value selects.
#[inline]
#[must_use]
pub fn equals_of<T: Equatable + ?Sized>(left: &T, right: &T) -> bool {
    EqualityStrategy::for_key(left).equals(left, right)
}

/// Deterministic 32-bit hash of a value's [`Hash`] implementation.
///
/// The 64-bit hasher output is folded so that both halves contribute.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn primitive_hash<T: Hash + ?Sized>(value: &T) -> u32 {
    #[cfg(feature = "fxhash")]
    let mut hasher = FxHasher::default();
    #[cfg(not(feature = "fxhash"))]
    let mut hasher = DefaultHasher::new();

    value.hash(&mut hasher);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

/// Combines element hashes the way sequence hash codes usually are.
#[inline]
const fn combine(accumulator: u32, hash: u32) -> u32 {
    accumulator.wrapping_mul(31).wrapping_add(hash)
}

// =============================================================================
// Implementations
// =============================================================================

macro_rules! primitive_equatable {
    ($($type:ty),* $(,)?) => {
        $(
            impl Equatable for $type {
                #[inline]
                fn primitive_hash(&self) -> u32 {
                    primitive_hash(self)
                }

                #[inline]
                fn primitive_equals(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

primitive_equatable!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, (), String, str,
);

impl<T: Equatable + ?Sized> Equatable for &T {
    fn has_equality(&self) -> bool {
        (**self).has_equality()
    }

    fn primitive_hash(&self) -> u32 {
        (**self).primitive_hash()
    }

    fn primitive_equals(&self, other: &Self) -> bool {
        (**self).primitive_equals(*other)
    }

    fn structural_hash(&self) -> u32 {
        (**self).structural_hash()
    }

    fn structural_equals(&self, other: &Self) -> bool {
        (**self).structural_equals(*other)
    }
}

/// Declares types with a [`HasEquality`] impl as structural [`Equatable`] keys.
///
/// ```rust
/// use hamtmap::{HasEquality, PersistentHashMap, structural_key};
///
/// #[derive(Clone)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl HasEquality for Point {
///     fn equals(&self, other: &Self) -> bool {
///         self.x == other.x && self.y == other.y
///     }
///
///     fn hash_code(&self) -> u32 {
///         (self.x as u32).wrapping_mul(31).wrapping_add(self.y as u32)
///     }
/// }
///
/// structural_key!(Point);
///
/// let map = PersistentHashMap::empty().insert(Point { x: 1, y: 2 }, "a");
/// assert_eq!(map.get(&Point { x: 1, y: 2 }), Some(&"a"));
/// ```
#[macro_export]
macro_rules! structural_key {
    ($($type:ty),* $(,)?) => {
        $(
            impl $crate::Equatable for $type {
                #[inline]
                fn has_equality(&self) -> bool {
                    true
                }

                #[inline]
                fn primitive_hash(&self) -> u32 {
                    $crate::HasEquality::hash_code(self)
                }

                #[inline]
                fn primitive_equals(&self, other: &Self) -> bool {
                    $crate::HasEquality::equals(self, other)
                }
            }
        )*
    };
}

impl<T: Equatable> HasEquality for Vec<T> {
    fn equals(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(left, right)| equals_of(left, right))
    }

    fn hash_code(&self) -> u32 {
        self.iter()
            .fold(1, |accumulator, element| combine(accumulator, hash_of(element)))
    }
}

impl<T: Equatable> HasEquality for Option<T> {
    fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(left), Some(right)) => equals_of(left, right),
            (None, None) => true,
            _ => false,
        }
    }

    fn hash_code(&self) -> u32 {
        self.as_ref().map_or(0, |value| combine(1, hash_of(value)))
    }
}

impl<A: Equatable, B: Equatable> HasEquality for (A, B) {
    fn equals(&self, other: &Self) -> bool {
        equals_of(&self.0, &other.0) && equals_of(&self.1, &other.1)
    }

    fn hash_code(&self) -> u32 {
        combine(combine(1, hash_of(&self.0)), hash_of(&self.1))
    }
}

impl<A: Equatable, B: Equatable, C: Equatable> HasEquality for (A, B, C) {
    fn equals(&self, other: &Self) -> bool {
        equals_of(&self.0, &other.0)
            && equals_of(&self.1, &other.1)
            && equals_of(&self.2, &other.2)
    }

    fn hash_code(&self) -> u32 {
        combine(
            combine(combine(1, hash_of(&self.0)), hash_of(&self.1)),
            hash_of(&self.2),
        )
    }
}

impl<T: Equatable> Equatable for Vec<T> {
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

impl<T: Equatable> Equatable for Option<T> {
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

impl<A: Equatable, B: Equatable> Equatable for (A, B) {
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

impl<A: Equatable, B: Equatable, C: Equatable> Equatable for (A, B, C) {
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

// =============================================================================
// Tests
// =============================================================================
