//! Replication activity reported by a server for one table.
//!
//! Each server publishes, per table, what it is currently doing for every
//! region of the key space it knows about: serving as primary, following as a
//! secondary, backfilling, or holding nothing. The records of one report never
//! overlap.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::region::KeyRange;

/// What a server is doing for one region of a table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Will become primary once it is safe to do so.
    PrimaryWhenSafe,
    Primary,
    SecondaryUpToDate,
    /// Secondary that lost contact with its primary; may be behind.
    SecondaryWithoutPrimary,
    SecondaryBackfilling,
    /// Will drop its data once that is safe.
    NothingWhenSafe,
    NothingWhenDoneErasing,
    Nothing,
}

/// One region of a report.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub region: KeyRange,
    pub activity: Activity,
}

impl ActivityRecord {
    pub fn new(region: KeyRange, activity: Activity) -> Self {
        Self { region, activity }
    }
}

/// The set of disjoint activity records a server reports for a table.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ActivityRecord>", into = "Vec<ActivityRecord>")]
pub struct ActivityReport {
    records: Vec<ActivityRecord>,
}

impl ActivityReport {
    /// Builds a report, rejecting records whose regions overlap.
    pub fn new(mut records: Vec<ActivityRecord>) -> Result<Self> {
        records.sort_by_key(|record| record.region.start);
        if let Some(pair) = records
            .windows(2)
            .find(|w| w[0].region.overlaps(&w[1].region))
        {
            return Err(Error::OverlappingActivities {
                first: pair[0].region.to_string(),
                second: pair[1].region.to_string(),
            });
        }
        Ok(Self { records })
    }

    /// Records ordered by region start.
    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<ActivityRecord>> for ActivityReport {
    type Error = Error;

    fn try_from(records: Vec<ActivityRecord>) -> Result<Self> {
        Self::new(records)
    }
}

impl From<ActivityReport> for Vec<ActivityRecord> {
    fn from(report: ActivityReport) -> Self {
        report.records
    }
}
