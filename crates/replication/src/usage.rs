//! Server usage accounting.
//!
//! Placement balances a new table against the load existing tables already
//! put on each server. That baseline is the sum, over existing table
//! configurations, of `secondary_usage_cost` for every replica a server holds
//! plus the difference to `primary_usage_cost` for every shard it directs.

use corelib::{ServerName, TableConfig};
use std::collections::BTreeMap;

use crate::settings::PlacementSettings;

/// Accumulated load units per server.
pub type ServerUsage = BTreeMap<ServerName, u64>;

/// Adds the load `config` puts on its servers to `usage`.
pub fn calculate_server_usage(
    config: &TableConfig,
    settings: &PlacementSettings,
    usage: &mut ServerUsage,
) {
    let director_extra = settings
        .primary_usage_cost
        .saturating_sub(settings.secondary_usage_cost);
    for shard in &config.shards {
        for server in &shard.replicas {
            *usage.entry(server.clone()).or_default() += settings.secondary_usage_cost;
        }
        *usage.entry(shard.director.clone()).or_default() += director_extra;
    }
}
