//! Shard schemes.
//!
//! A shard scheme cuts the key space into `n` contiguous, non-empty ranges
//! using `n - 1` strictly increasing split points. Shard `i` covers
//! `[split[i-1], split[i])`, with the first shard starting at position 0 and
//! the last one running to the end of the key space.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::region::{key_position, KeyRange, KEY_SPACE_SIZE};

/// Largest shard count `uniform` will build.
pub const MAX_UNIFORM_SHARDS: usize = 1 << 16;

/// Immutable mapping from shard index to key range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct ShardScheme {
    split_points: Vec<u64>,
}

impl ShardScheme {
    /// Splits the key space into `num_shards` ranges of (nearly) equal size.
    pub fn uniform(num_shards: usize) -> Result<Self> {
        if num_shards == 0 {
            return Err(Error::InvalidShardScheme(
                "a shard scheme needs at least one shard".to_string(),
            ));
        }
        if num_shards > MAX_UNIFORM_SHARDS {
            return Err(Error::InvalidShardScheme(format!(
                "{num_shards} shards is more than the {MAX_UNIFORM_SHARDS} a uniform scheme allows"
            )));
        }
        let n = num_shards as u128;
        // i * 2^64 / n < 2^64 for i < n, so the cast never truncates
        let split_points = (1..n).map(|i| (i * KEY_SPACE_SIZE / n) as u64).collect();
        Self::from_split_points(split_points)
    }

    /// Builds a scheme from explicit split points.
    pub fn from_split_points(split_points: Vec<u64>) -> Result<Self> {
        if split_points.first() == Some(&0) {
            return Err(Error::InvalidShardScheme(
                "split point 0 would leave the first shard empty".to_string(),
            ));
        }
        if let Some(pair) = split_points.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidShardScheme(format!(
                "split points must be strictly increasing, found {} then {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { split_points })
    }

    pub fn num_shards(&self) -> usize {
        self.split_points.len() + 1
    }

    pub fn split_points(&self) -> &[u64] {
        &self.split_points
    }

    /// Key range of shard `shard`, or `None` if the index is out of bounds.
    pub fn shard_range(&self, shard: usize) -> Option<KeyRange> {
        if shard >= self.num_shards() {
            return None;
        }
        let start = if shard == 0 { 0 } else { self.split_points[shard - 1] };
        let end = self.split_points.get(shard).copied();
        Some(KeyRange { start, end })
    }

    /// All shard ranges in index order.
    pub fn ranges(&self) -> impl Iterator<Item = KeyRange> + '_ {
        (0..self.num_shards()).filter_map(|shard| self.shard_range(shard))
    }

    /// Index of the shard whose range contains `position`.
    pub fn shard_for_position(&self, position: u64) -> usize {
        self.split_points.partition_point(|&split| split <= position)
    }

    /// Index of the shard that stores `key`.
    pub fn shard_for_key(&self, key: &[u8]) -> usize {
        self.shard_for_position(key_position(key))
    }
}

impl TryFrom<Vec<u64>> for ShardScheme {
    type Error = Error;

    fn try_from(split_points: Vec<u64>) -> Result<Self> {
        Self::from_split_points(split_points)
    }
}

impl From<ShardScheme> for Vec<u64> {
    fn from(scheme: ShardScheme) -> Self {
        scheme.split_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_shard_covers_everything() {
        let scheme = ShardScheme::uniform(1).unwrap();
        assert_eq!(scheme.num_shards(), 1);
        assert_eq!(scheme.shard_range(0), Some(KeyRange::full()));
        assert_eq!(scheme.shard_range(1), None);
    }

    #[test]
    fn test_uniform_split() {
        let scheme = ShardScheme::uniform(4).unwrap();
        assert_eq!(scheme.split_points(), &[1 << 62, 1 << 63, 3 << 62]);
        let sizes: Vec<u128> = scheme.ranges().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![1 << 62; 4]);
    }

    #[test]
    fn test_rejects_bad_split_points() {
        assert!(ShardScheme::uniform(0).is_err());
        assert!(ShardScheme::uniform(MAX_UNIFORM_SHARDS + 1).is_err());
        assert!(ShardScheme::uniform(usize::MAX).is_err());
        assert!(ShardScheme::from_split_points(vec![0, 10]).is_err());
        assert!(ShardScheme::from_split_points(vec![10, 10]).is_err());
        assert!(ShardScheme::from_split_points(vec![20, 10]).is_err());
    }

    #[test]
    fn test_shard_for_position_boundaries() {
        let scheme = ShardScheme::from_split_points(vec![100, 200]).unwrap();
        assert_eq!(scheme.shard_for_position(0), 0);
        assert_eq!(scheme.shard_for_position(99), 0);
        assert_eq!(scheme.shard_for_position(100), 1);
        assert_eq!(scheme.shard_for_position(199), 1);
        assert_eq!(scheme.shard_for_position(200), 2);
        assert_eq!(scheme.shard_for_position(u64::MAX), 2);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ShardScheme = serde_json::from_str("[100, 200]").unwrap();
        assert_eq!(ok.num_shards(), 3);
        assert!(serde_json::from_str::<ShardScheme>("[200, 100]").is_err());
    }
}
