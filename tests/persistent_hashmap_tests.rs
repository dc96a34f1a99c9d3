//! Unit tests for PersistentHashMap.
//!
//! Covers the map-level contract: lookups, overwrites, merges, removal,
//! strategy binding, whole-map equality and the derived transformations.

use hamtmap::persistent::{PersistentHashMap, PersistentHashSet};
use hamtmap::{EqualityStrategy, HasEquality, MapError, structural_key};
use rstest::rstest;

// =============================================================================
// Test keys
// =============================================================================

/// A key whose hash is chosen by the test, to force collisions and deep splits.
#[derive(Clone, Debug)]
struct HashedKey {
    id: u32,
    hash: u32,
}

impl HashedKey {
    const fn new(id: u32, hash: u32) -> Self {
        Self { id, hash }
    }
}

impl HasEquality for HashedKey {
    fn equals(&self, other: &Self) -> bool {
        self.id == other.id
    }

    fn hash_code(&self) -> u32 {
        self.hash
    }
}

structural_key!(HashedKey);

/// A key compared case-insensitively through its own capability.
#[derive(Clone, Debug)]
struct CaseInsensitive(&'static str);

impl HasEquality for CaseInsensitive {
    fn equals(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }

    fn hash_code(&self) -> u32 {
        hamtmap::primitive_hash(&self.0.to_ascii_lowercase())
    }
}

structural_key!(CaseInsensitive);

// =============================================================================
// Empty map
// =============================================================================

#[rstest]
fn test_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::empty();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.get("key"), None);
    assert!(map.key_set().is_empty());
    assert_eq!(map.iter().count(), 0);
}

#[rstest]
fn test_default_and_new_are_empty() {
    let default: PersistentHashMap<i32, i32> = PersistentHashMap::default();
    let new: PersistentHashMap<i32, i32> = PersistentHashMap::new();

    assert!(default.is_empty());
    assert!(new.is_empty());
    assert_eq!(default.strategy(), None);
}

// =============================================================================
// Insert and get
// =============================================================================

#[rstest]
#[case("a", 1)]
#[case("", 0)]
#[case("a longer key with spaces", -7)]
fn test_insert_then_get(#[case] key: &str, #[case] value: i32) {
    let map = PersistentHashMap::empty().insert(key.to_string(), value);
    assert_eq!(map.get(key), Some(&value));
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_absent_key_is_none() {
    let map = PersistentHashMap::empty().insert(1, "one").insert(2, "two");
    assert_eq!(map.get(&3), None);
    assert!(!map.contains_key(&3));
}

#[rstest]
fn test_overwrite_keeps_length() {
    let map = PersistentHashMap::empty().insert("k", 1).insert("k", 2);
    assert_eq!(map.get(&"k"), Some(&2));
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_insert_does_not_modify_original() {
    let map1 = PersistentHashMap::empty().insert("key", 1);
    let map2 = map1.insert("key2", 2);

    assert_eq!(map1.len(), 1);
    assert_eq!(map1.get(&"key2"), None);
    assert_eq!(map2.len(), 2);
    assert_eq!(map2.get(&"key2"), Some(&2));
}

#[rstest]
#[case(10)]
#[case(1_000)]
#[case(20_000)]
fn test_distinct_inserts_count(#[case] count: u32) {
    let map = (0..count).fold(PersistentHashMap::empty(), |map, index| map.insert(index, index * 2));

    assert_eq!(map.len(), count as usize);
    for index in 0..count {
        assert_eq!(map.get(&index), Some(&(index * 2)));
    }
    assert_eq!(map.get(&count), None);
}

#[rstest]
fn test_get_or_error() {
    let map = PersistentHashMap::empty().insert("present", 1);

    assert_eq!(map.get_or_error(&"present"), Ok(&1));
    assert_eq!(
        map.get_or_error(&"missing"),
        Err(MapError::KeyNotFound {
            key: "\"missing\"".to_string()
        })
    );
}

#[rstest]
fn test_get_key_value_returns_stored_key() {
    let map = PersistentHashMap::empty().insert(CaseInsensitive("Key"), 1);
    let (key, value) = map.get_key_value(&CaseInsensitive("KEY")).unwrap();

    assert_eq!(key.0, "Key");
    assert_eq!(*value, 1);
}

// =============================================================================
// Merge on insert
// =============================================================================

#[rstest]
fn test_insert_with_merge_on_existing_key() {
    let map = PersistentHashMap::empty()
        .insert("k", 1)
        .insert_with_merge("k", 2, |existing, value| existing + value);

    assert_eq!(map.get(&"k"), Some(&3));
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_insert_with_merge_on_fresh_key_skips_merge() {
    let map = PersistentHashMap::empty()
        .insert("a", 1)
        .insert_with_merge("b", 2, |_, _| panic!("merge must not run for a fresh key"));

    assert_eq!(map.get(&"b"), Some(&2));
    assert_eq!(map.len(), 2);
}

#[rstest]
fn test_insert_with_merge_on_empty_map() {
    let map = PersistentHashMap::empty().insert_with_merge(1, 5, |existing, value| existing * value);
    assert_eq!(map.get(&1), Some(&5));
}

// =============================================================================
// Strategy binding
// =============================================================================

#[rstest]
fn test_structural_keys_use_their_own_equality() {
    let map = PersistentHashMap::empty()
        .insert(CaseInsensitive("Hello"), 1)
        .insert(CaseInsensitive("HELLO"), 2);

    assert_eq!(map.strategy(), Some(EqualityStrategy::Structural));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&CaseInsensitive("hello")), Some(&2));
}

#[rstest]
fn test_strategy_survives_derivation() {
    let map = PersistentHashMap::empty().insert(vec![1, 2], "a");
    let derived = map.insert(vec![3], "b").remove(&vec![1, 2]).map_values(|value| value.len());

    assert_eq!(derived.strategy(), Some(EqualityStrategy::Structural));
    assert_eq!(derived.get(&vec![3]), Some(&1));
}

// =============================================================================
// Hash collisions and trie shape
// =============================================================================

#[rstest]
fn test_full_hash_collisions_are_kept_apart() {
    let keys: Vec<HashedKey> = (0..5).map(|id| HashedKey::new(id, 42)).collect();
    let map = keys
        .iter()
        .fold(PersistentHashMap::empty(), |map, key| map.insert(key.clone(), key.id));

    assert_eq!(map.len(), 5);
    for key in &keys {
        assert_eq!(map.get(key), Some(&key.id));
    }
    assert_eq!(map.get(&HashedKey::new(99, 42)), None);
}

#[rstest]
fn test_collision_overwrite_and_remove() {
    let first = HashedKey::new(1, 7);
    let second = HashedKey::new(2, 7);
    let map = PersistentHashMap::empty()
        .insert(first.clone(), "one")
        .insert(second.clone(), "two")
        .insert(first.clone(), "uno");

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&first), Some(&"uno"));

    let removed = map.remove(&first);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed.get(&first), None);
    assert_eq!(removed.get(&second), Some(&"two"));
}

#[rstest]
fn test_collision_next_to_other_hashes() {
    let colliding_a = HashedKey::new(1, 0b00001_00001);
    let colliding_b = HashedKey::new(2, 0b00001_00001);
    let neighbour = HashedKey::new(3, 0b00010_00001);
    let far = HashedKey::new(4, 0b00000_00010);

    let map = PersistentHashMap::empty()
        .insert(colliding_a.clone(), 'a')
        .insert(colliding_b.clone(), 'b')
        .insert(neighbour.clone(), 'n')
        .insert(far.clone(), 'f');

    assert_eq!(map.len(), 4);
    assert_eq!(map.get(&colliding_a), Some(&'a'));
    assert_eq!(map.get(&colliding_b), Some(&'b'));
    assert_eq!(map.get(&neighbour), Some(&'n'));
    assert_eq!(map.get(&far), Some(&'f'));

    let trimmed = map.remove(&neighbour).remove(&colliding_a);
    assert_eq!(trimmed.len(), 2);
    assert_eq!(trimmed.get(&colliding_b), Some(&'b'));
    assert_eq!(trimmed.get(&far), Some(&'f'));
}

#[rstest]
fn test_hashes_differing_only_in_top_bits() {
    let low = HashedKey::new(1, 0x0000_0001);
    let high = HashedKey::new(2, 0x8000_0001);
    let map = PersistentHashMap::empty()
        .insert(low.clone(), 1)
        .insert(high.clone(), 2);

    assert_eq!(map.get(&low), Some(&1));
    assert_eq!(map.get(&high), Some(&2));
    assert_eq!(map.remove(&low).get(&high), Some(&2));
}

// =============================================================================
// Remove
// =============================================================================

#[rstest]
fn test_remove_existing_and_missing() {
    let map = PersistentHashMap::empty().insert("a", 1).insert("b", 2);

    let removed = map.remove(&"a");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed.get(&"a"), None);
    assert_eq!(removed.get(&"b"), Some(&2));

    let unchanged = map.remove(&"zzz");
    assert_eq!(unchanged, map);
    assert_eq!(map.len(), 2);
}

#[rstest]
fn test_remove_everything() {
    let map: PersistentHashMap<u32, u32> = (0..500).map(|index| (index, index)).collect();
    let emptied = (0..500).fold(map.clone(), |map, index| map.remove(&index));

    assert!(emptied.is_empty());
    assert_eq!(emptied, PersistentHashMap::empty());
    assert_eq!(map.len(), 500);
}

// =============================================================================
// Equality and hashing
// =============================================================================

#[rstest]
fn test_equals_is_order_independent() {
    let left = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
    let right = PersistentHashMap::empty().insert("b", 2).insert("a", 1);

    assert_eq!(left, right);
    assert_eq!(left.hash_code(), right.hash_code());
}

#[rstest]
fn test_empty_equals_emptied_map() {
    let emptied = PersistentHashMap::empty().insert("a", 1).remove(&"a");
    assert_eq!(PersistentHashMap::empty(), emptied);
    assert_eq!(emptied, PersistentHashMap::empty());
}

#[rstest]
fn test_maps_of_different_sizes_differ() {
    let small = PersistentHashMap::empty().insert(1, 1);
    let large = small.insert(2, 2);
    assert_ne!(small, large);
}

#[rstest]
fn test_maps_as_keys() {
    let key_a = PersistentHashMap::empty().insert("x", 1).insert("y", 2);
    let key_b = PersistentHashMap::empty().insert("y", 2).insert("x", 1);
    let outer = PersistentHashMap::empty().insert(key_a, "found");

    assert_eq!(outer.strategy(), Some(EqualityStrategy::Structural));
    assert_eq!(outer.get(&key_b), Some(&"found"));
}

// =============================================================================
// Merge with
// =============================================================================

#[rstest]
fn test_merge_with_combines_overlapping_keys() {
    let left = PersistentHashMap::empty().insert("a", 1).insert("b", 2);
    let right = PersistentHashMap::empty().insert("b", 20).insert("c", 3);
    let expected = PersistentHashMap::empty()
        .insert("a", 1)
        .insert("b", 22)
        .insert("c", 3);

    assert_eq!(left.merge_with(&right, |x, y| x + y), expected);
    assert_eq!(left.len(), 2);
    assert_eq!(right.len(), 2);
}

#[rstest]
fn test_merge_with_argument_order() {
    let left = PersistentHashMap::empty().insert("k", "left".to_string());
    let right = PersistentHashMap::empty().insert("k", "right".to_string());

    let merged = left.merge_with(&right, |existing, incoming| format!("{existing}+{incoming}"));
    assert_eq!(merged.get(&"k"), Some(&"left+right".to_string()));
}

// =============================================================================
// Transformations
// =============================================================================

#[rstest]
fn test_map_values_preserves_size() {
    let map: PersistentHashMap<i32, i32> = (0..100).map(|index| (index, index)).collect();
    let mapped = map.map_values(|value| value.to_string());

    assert_eq!(mapped.len(), map.len());
    assert_eq!(mapped.get(&42), Some(&"42".to_string()));
}

#[rstest]
fn test_map_entries_collision_keeps_last_in_enumeration_order() {
    let map = PersistentHashMap::empty().insert(1, "a").insert(2, "b");
    let collapsed = map.map_entries(|_, value| (0, *value));

    let last_value = *map.values().last().unwrap();
    assert_eq!(collapsed.len(), 1);
    assert_eq!(collapsed.get(&0), Some(&last_value));
}

#[rstest]
fn test_map_entries_rebinds_strategy() {
    let map = PersistentHashMap::empty().insert(1, "a");
    let rekeyed = map.map_entries(|key, value| (vec![*key], value.len()));

    assert_eq!(rekeyed.strategy(), Some(EqualityStrategy::Structural));
    assert_eq!(rekeyed.get(&vec![1]), Some(&1));
}

#[rstest]
fn test_key_set_matches_enumeration_order() {
    let map: PersistentHashMap<i32, i32> = (0..50).map(|index| (index, -index)).collect();
    let keys = map.key_set();
    let expected: PersistentHashSet<i32> = (0..50).collect();

    assert_eq!(keys, expected);
    assert!(keys.iter().eq(map.keys()));
}

#[rstest]
fn test_group_by_parity_equals_hand_built_map() {
    let grouped = PersistentHashMap::group_by(vec![1, 2, 3, 4], |value| value % 2);
    let expected = PersistentHashMap::empty()
        .insert(0, vec![2, 4])
        .insert(1, vec![1, 3]);

    assert_eq!(grouped, expected);
}

// =============================================================================
// Iteration and formatting
// =============================================================================

#[rstest]
fn test_iteration_agrees_with_fold() {
    let map: PersistentHashMap<u32, u32> = (0..300).map(|index| (index, index + 1)).collect();

    let folded = map.fold(Vec::new(), |mut entries, key, value| {
        entries.push((*key, *value));
        entries
    });
    let iterated: Vec<(u32, u32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
    let owned: Vec<(u32, u32)> = map.clone().into_iter().collect();

    assert_eq!(folded, iterated);
    assert_eq!(owned, iterated);
    assert_eq!(iterated.len(), 300);
}

#[rstest]
fn test_display_uses_enumeration_order() {
    let map = PersistentHashMap::empty().insert(1, "one").insert(2, "two");
    let expected = format!(
        "{{{}}}",
        map.iter()
            .map(|(key, value)| format!("{key} => {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    assert_eq!(map.to_string(), expected);
}

#[rstest]
fn test_debug_output() {
    let map = PersistentHashMap::empty().insert("k", 1);
    assert_eq!(format!("{map:?}"), "{\"k\": 1}");
}
