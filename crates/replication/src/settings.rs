//! Tuning knobs for placement.
//!
//! Only the ratio `primary_usage_cost / secondary_usage_cost` influences the
//! result; being director for a shard must cost more than holding a plain
//! replica of it, so that directors spread before replicas do.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlacementError, Result};

/// Hard ceiling on shards per table; bounds the size of the computation.
pub const MAX_SHARDS: usize = 32;

pub const PRIMARY_USAGE_COST: u64 = 10;
pub const SECONDARY_USAGE_COST: u64 = 8;

/// How long a calculation may hold the CPU before yielding.
pub const DEFAULT_YIELD_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub max_shards: usize,
    pub primary_usage_cost: u64,
    pub secondary_usage_cost: u64,
    pub yield_interval_ms: u64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            max_shards: MAX_SHARDS,
            primary_usage_cost: PRIMARY_USAGE_COST,
            secondary_usage_cost: SECONDARY_USAGE_COST,
            yield_interval_ms: DEFAULT_YIELD_INTERVAL.as_millis() as u64,
        }
    }
}

impl PlacementSettings {
    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_shards == 0 {
            return Err(PlacementError::InvalidSettings(
                "max_shards must be at least 1".to_string(),
            ));
        }
        if self.secondary_usage_cost == 0 {
            return Err(PlacementError::InvalidSettings(
                "secondary_usage_cost must be positive".to_string(),
            ));
        }
        if self.primary_usage_cost <= self.secondary_usage_cost {
            return Err(PlacementError::InvalidSettings(format!(
                "primary_usage_cost ({}) must exceed secondary_usage_cost ({})",
                self.primary_usage_cost, self.secondary_usage_cost
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PlacementSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.yield_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: PlacementSettings =
            serde_json::from_str(r#"{"yield_interval_ms": 0}"#).unwrap();
        assert_eq!(settings.yield_interval(), Duration::ZERO);
        assert_eq!(settings.max_shards, MAX_SHARDS);
    }

    #[test]
    fn test_director_must_cost_more() {
        let settings = PlacementSettings {
            primary_usage_cost: 8,
            ..PlacementSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(PlacementError::InvalidSettings(_))
        ));
    }
}
