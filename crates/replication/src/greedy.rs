//! Greedy assignment of servers to shards.
//!
//! # Algorithm
//!
//! 1. Pop the best-ranked server group
//! 2. Take its cheapest remaining pairing
//! 3. If that shard still needs replicas, commit the pairing and charge the
//!    group `usage_cost`
//! 4. Put the group back at its new rank unless it has no pairings left
//!
//! A pairing whose shard is already full is discarded, never retried. The
//! algorithm does not backtrack, so on some inputs the final distribution is
//! uneven: with servers A, B, C, three shards, and a director plus one more
//! replica per shard, directors land on A, B, C, replicas for the first two
//! shards land on A and B, and the third shard's replica can only go to A or
//! B because C already directs it. One server ends with three replicas and
//! one with a single replica.

use corelib::ServerName;
use tracing::trace;

use crate::error::{PlacementError, Result};
use crate::pairing::PairingQueue;
use crate::yielder::{Interruptor, LongCalculationYielder, Scheduler};

/// One round of greedy assignment.
#[derive(Debug, Clone, Copy)]
pub struct Round {
    pub num_shards: usize,
    /// Commitments required per shard.
    pub replicas_per_shard: usize,
    /// Added to a group's `self_usage_cost` per commitment.
    pub usage_cost: u64,
}

/// Picks `replicas_per_shard` servers for every shard from `pairings`,
/// reporting each choice as `commit(shard, server)`.
pub async fn pick_best_pairings<S, F>(
    round: Round,
    mut pairings: PairingQueue,
    yielder: &mut LongCalculationYielder<'_, S>,
    interruptor: &dyn Interruptor,
    mut commit: F,
) -> Result<()>
where
    S: Scheduler + ?Sized,
    F: FnMut(usize, &ServerName),
{
    let target = round.num_shards * round.replicas_per_shard;
    let mut shard_replicas = vec![0usize; round.num_shards];
    let mut total = 0;

    while total < target {
        let Some(mut group) = pairings.pop_min() else {
            return Err(PlacementError::InternalInconsistency(format!(
                "ran out of candidate servers after {total} of {target} assignments"
            )));
        };
        let Some(pairing) = group.take_cheapest() else {
            return Err(PlacementError::InternalInconsistency(format!(
                "server `{}` was ranked without candidates",
                group.server
            )));
        };
        let fulfilled = shard_replicas.get_mut(pairing.shard).ok_or_else(|| {
            PlacementError::InternalInconsistency(format!(
                "candidate for shard {} of a {}-shard table",
                pairing.shard, round.num_shards
            ))
        })?;

        if *fulfilled < round.replicas_per_shard {
            trace!(
                shard = pairing.shard,
                server = %group.server,
                backfill_cost = pairing.backfill_cost,
                self_usage_cost = group.self_usage_cost,
                "assigned"
            );
            commit(pairing.shard, &group.server);
            *fulfilled += 1;
            total += 1;
            group.self_usage_cost += round.usage_cost;
        }

        pairings.insert(group);
        yielder.maybe_yield(interruptor).await?;
    }

    Ok(())
}
