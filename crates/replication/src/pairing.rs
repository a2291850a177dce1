//! Pairings and their ranking.
//!
//! A `Pairing` is the possibility of placing a replica of one shard on one
//! server. Pairings are ranked by three costs:
//!
//! 1. `self_usage_cost`: load this table already put on the server
//! 2. `backfill_cost`: data that would have to be copied to the server
//! 3. `other_usage_cost`: load from other tables on the server
//!
//! `self_usage_cost` changes with every assignment, so it is stored once for
//! all pairings of a server in a `ServerPairings` group, and groups are what
//! the `PairingQueue` ranks: by `self_usage_cost`, then by the backfill cost
//! of the group's cheapest pairing, then by `other_usage_cost`, and finally by
//! server name so the order is total.
//!
//! # Re-ranking
//!
//! A group's rank key is computed when it enters the queue and is never
//! touched while it is inside. To change a group, pop it, mutate it, and
//! insert it again.

use corelib::ServerName;
use priority_queue::PriorityQueue;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, HashMap};

/// One (server, shard) placement candidate; the server is implied by the
/// group holding it.
#[derive(Debug, Clone, Copy)]
pub struct Pairing {
    pub backfill_cost: f64,
    pub shard: usize,
}

impl PartialEq for Pairing {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pairing {}

impl PartialOrd for Pairing {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pairing {
    /// Cheapest first; equal costs in shard order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.backfill_cost
            .total_cmp(&other.backfill_cost)
            .then(self.shard.cmp(&other.shard))
    }
}

/// All remaining pairings of one server plus its running usage costs.
#[derive(Debug, Clone)]
pub struct ServerPairings {
    pub server: ServerName,
    pub self_usage_cost: u64,
    pub other_usage_cost: u64,
    pairings: BTreeSet<Pairing>,
}

impl ServerPairings {
    pub fn new(server: ServerName, other_usage_cost: u64) -> Self {
        Self {
            server,
            self_usage_cost: 0,
            other_usage_cost,
            pairings: BTreeSet::new(),
        }
    }

    pub fn add_pairing(&mut self, shard: usize, backfill_cost: f64) {
        self.pairings.insert(Pairing {
            backfill_cost,
            shard,
        });
    }

    pub fn cheapest(&self) -> Option<&Pairing> {
        self.pairings.first()
    }

    pub fn take_cheapest(&mut self) -> Option<Pairing> {
        self.pairings.pop_first()
    }

    /// Drops the pairing for `shard`; returns whether there was one.
    pub fn remove_shard(&mut self, shard: usize) -> bool {
        let before = self.pairings.len();
        self.pairings.retain(|p| p.shard != shard);
        self.pairings.len() != before
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    pub fn pairings(&self) -> impl Iterator<Item = &Pairing> {
        self.pairings.iter()
    }

    fn rank(&self) -> Option<Rank> {
        self.cheapest().map(|best| Rank {
            self_usage_cost: self.self_usage_cost,
            best_backfill_cost: best.backfill_cost,
            other_usage_cost: self.other_usage_cost,
            server: self.server.clone(),
        })
    }
}

/// Snapshot of a group's ranking key, taken on insertion.
#[derive(Debug, Clone)]
struct Rank {
    self_usage_cost: u64,
    best_backfill_cost: f64,
    other_usage_cost: u64,
    server: ServerName,
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.self_usage_cost
            .cmp(&other.self_usage_cost)
            .then(self.best_backfill_cost.total_cmp(&other.best_backfill_cost))
            .then(self.other_usage_cost.cmp(&other.other_usage_cost))
            .then_with(|| self.server.cmp(&other.server))
    }
}

/// Ordered set of server groups, best (lowest) rank first.
///
/// Groups without pairings are never kept. At most one group per server.
#[derive(Debug, Default)]
pub struct PairingQueue {
    ranks: PriorityQueue<ServerName, Reverse<Rank>>,
    groups: HashMap<ServerName, ServerPairings>,
}

impl PairingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `group` at its current rank. Empty groups are dropped and a group
    /// for a server already queued replaces it.
    pub fn insert(&mut self, group: ServerPairings) {
        let Some(rank) = group.rank() else {
            return;
        };
        self.ranks.push(group.server.clone(), Reverse(rank));
        self.groups.insert(group.server.clone(), group);
    }

    /// Removes and returns the best-ranked group.
    pub fn pop_min(&mut self) -> Option<ServerPairings> {
        let (server, _) = self.ranks.pop()?;
        self.groups.remove(&server)
    }

    pub fn peek_min(&self) -> Option<&ServerPairings> {
        let (server, _) = self.ranks.peek()?;
        self.groups.get(server)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<ServerPairings> for PairingQueue {
    fn from_iter<I: IntoIterator<Item = ServerPairings>>(iter: I) -> Self {
        let mut queue = Self::new();
        for group in iter {
            queue.insert(group);
        }
        queue
    }
}
