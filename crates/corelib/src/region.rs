//! Key space regions.
//!
//! Keys are hashed onto a `u64` position and every region of the key space is
//! a half-open range of positions. The upper end may be unbounded, which is
//! how the last shard of a scheme reaches the end of the key space.
//!
//! # Measuring
//!
//! Region sizes are reported as `u128` so the full key space (2^64 positions)
//! has an exact size. Sizes are what the backfill estimator weights activity
//! costs by.

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Number of positions in the whole key space.
pub const KEY_SPACE_SIZE: u128 = 1 << 64;

/// Hashes a key onto its position in the key space.
pub fn key_position(key: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Half-open range `[start, end)` of key positions; `end == None` is unbounded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawKeyRange")]
pub struct KeyRange {
    pub start: u64,
    pub end: Option<u64>,
}

/// Wire form of a `KeyRange`, checked by `KeyRange::new` on the way in.
#[derive(Deserialize)]
struct RawKeyRange {
    start: u64,
    #[serde(default)]
    end: Option<u64>,
}

impl TryFrom<RawKeyRange> for KeyRange {
    type Error = Error;

    fn try_from(raw: RawKeyRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl KeyRange {
    /// Creates a non-empty range.
    pub fn new(start: u64, end: Option<u64>) -> Result<Self> {
        match end {
            Some(end) if end <= start => Err(Error::InvalidKeyRange { start, end }),
            _ => Ok(Self { start, end }),
        }
    }

    /// The whole key space.
    pub const fn full() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    fn end_exclusive(&self) -> u128 {
        self.end.map_or(KEY_SPACE_SIZE, u128::from)
    }

    /// Number of positions covered.
    pub fn len(&self) -> u128 {
        self.end_exclusive().saturating_sub(u128::from(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && self.end.map_or(true, |end| position < end)
    }

    /// Returns the overlap of two ranges, or `None` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        let range = Self { start, end };
        (!range.is_empty()).then_some(range)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersection(other).is_some()
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{:016x}, {:016x})", self.start, end),
            None => write!(f, "[{:016x}, +inf)", self.start),
        }
    }
}
