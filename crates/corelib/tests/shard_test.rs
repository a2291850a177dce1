//! Tests for shard schemes and key ranges.
//!
//! # Test Strategy
//!
//! 1. **Basic functionality**: Uniform schemes, explicit split points
//! 2. **Coverage**: Shards tile the key space without gaps or overlap
//! 3. **Routing**: Keys land in the shard whose range contains them

use corelib::region::{key_position, KEY_SPACE_SIZE};
use corelib::{KeyRange, ShardScheme};
use proptest::prelude::*;

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_uniform_scheme_at_shard_ceiling() {
    let scheme = ShardScheme::uniform(32).unwrap();
    assert_eq!(scheme.num_shards(), 32);

    let sizes: Vec<u128> = scheme.ranges().map(|r| r.len()).collect();
    let min = *sizes.iter().min().unwrap();
    let max = *sizes.iter().max().unwrap();
    assert!(max - min <= 1, "uniform shards differ by at most one position");
}

#[test]
fn test_last_shard_is_unbounded() {
    let scheme = ShardScheme::from_split_points(vec![10, 20]).unwrap();
    assert_eq!(
        scheme.shard_range(2),
        Some(KeyRange {
            start: 20,
            end: None,
        })
    );
}

// ============================================================================
// Coverage
// ============================================================================

fn split_points() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::btree_set(1u64.., 0..31).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn test_shards_tile_key_space(points in split_points()) {
        let scheme = ShardScheme::from_split_points(points).unwrap();
        let ranges: Vec<KeyRange> = scheme.ranges().collect();

        prop_assert_eq!(ranges.len(), scheme.num_shards());
        prop_assert_eq!(ranges[0].start, 0);
        prop_assert_eq!(ranges.last().unwrap().end, None);
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].end, Some(pair[1].start));
            prop_assert!(!pair[0].overlaps(&pair[1]));
        }
        let total: u128 = ranges.iter().map(|r| r.len()).sum();
        prop_assert_eq!(total, KEY_SPACE_SIZE);
    }

    #[test]
    fn test_key_routes_to_containing_shard(
        points in split_points(),
        key in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let scheme = ShardScheme::from_split_points(points).unwrap();
        let shard = scheme.shard_for_key(&key);
        let range = scheme.shard_range(shard).unwrap();
        prop_assert!(range.contains(key_position(&key)));
    }
}
