//! Table configuration: the output of replica placement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::server::ServerName;

/// Placement of one shard. `replicas` always contains `director`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    pub director: ServerName,
    pub replicas: BTreeSet<ServerName>,
}

/// Per-shard placement of a table, in shard index order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub shards: Vec<ShardConfig>,
}

impl TableConfig {
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Number of shards `server` directs.
    pub fn directed_by(&self, server: &ServerName) -> usize {
        self.shards.iter().filter(|s| &s.director == server).count()
    }

    /// Number of shards `server` holds a replica of, directors included.
    pub fn replicated_on(&self, server: &ServerName) -> usize {
        self.shards
            .iter()
            .filter(|s| s.replicas.contains(server))
            .count()
    }

    /// Every server named anywhere in the configuration.
    pub fn servers(&self) -> BTreeSet<&ServerName> {
        self.shards.iter().flat_map(|s| s.replicas.iter()).collect()
    }
}
