//! Backfill cost estimation.
//!
//! `estimate_cost_to_get_up_to_date` scores how much trouble it would be to
//! bring a server up to date for a shard, from the activity the server
//! reports for the table. Each part of the shard is scored by what the server
//! is doing there, and the scores are averaged weighted by region size.
//!
//! | Activity | Cost |
//! |---|---|
//! | primary, primary when safe | 0 |
//! | secondary up to date | 1 |
//! | secondary without primary, secondary backfilling | 2 |
//! | nothing (any flavor), or not covered by the report | 3 |
//!
//! # Performance
//!
//! O(r) per (server, shard) pair, where r = records in the report. Reports
//! usually hold O(shards) records.

use corelib::{Activity, ActivityReport, KeyRange};

/// Cost of a server that has to copy the whole region.
pub const MAX_BACKFILL_COST: f64 = 3.0;

/// Cost of serving `activity` for a region.
pub fn activity_cost(activity: Activity) -> f64 {
    match activity {
        Activity::PrimaryWhenSafe | Activity::Primary => 0.0,
        Activity::SecondaryUpToDate => 1.0,
        Activity::SecondaryWithoutPrimary | Activity::SecondaryBackfilling => 2.0,
        Activity::NothingWhenSafe | Activity::NothingWhenDoneErasing | Activity::Nothing => {
            MAX_BACKFILL_COST
        }
    }
}

/// Region-weighted mean activity cost of `report` over `shard`.
pub fn estimate_cost_to_get_up_to_date(report: &ActivityReport, shard: &KeyRange) -> f64 {
    let shard_len = shard.len();
    if shard_len == 0 {
        return MAX_BACKFILL_COST;
    }

    let mut covered: u128 = 0;
    let mut weighted = 0.0;
    for record in report.records() {
        if let Some(overlap) = record.region.intersection(shard) {
            let len = overlap.len();
            covered += len;
            weighted += activity_cost(record.activity) * len as f64;
        }
    }
    // Records are disjoint, so `covered` never exceeds the shard
    let uncovered = shard_len.saturating_sub(covered);
    weighted += MAX_BACKFILL_COST * uncovered as f64;

    weighted / shard_len as f64
}

/// Backfill cost of placing a replica of `shard` on a server.
///
/// `report` is `None` when the server published nothing for the table, which
/// is scored as a full copy. A table that does not exist yet has nothing to
/// copy, so callers pass cost 0 for it without consulting any report.
pub fn backfill_cost(report: Option<&ActivityReport>, shard: &KeyRange) -> f64 {
    report.map_or(MAX_BACKFILL_COST, |report| {
        estimate_cost_to_get_up_to_date(report, shard)
    })
}
