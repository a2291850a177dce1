//! Table configuration generation.
//!
//! Drives placement for one table:
//!
//! 1. Snapshot tag membership and validate the request against it
//! 2. Check every tag has enough servers for the replicas asked of it
//! 3. For an existing table, snapshot the activity reports of those servers
//! 4. Per tag with replicas: rank (server, shard) pairings, pick directors
//!    if it is the director tag, then pick the remaining replicas
//! 5. Check every shard ended with one director and the full replica count
//!
//! Nothing is written to the output until the final step, so an error or a
//! cancellation part way through leaves no partial configuration behind.

use corelib::{KeyRange, ServerName, ShardConfig, ShardScheme, TableConfig, TableId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::backfill::backfill_cost;
use crate::directory::{capture_tag_membership, ClusterDirectory, DirectorySnapshot};
use crate::error::{PlacementError, Result};
use crate::greedy::{pick_best_pairings, Round};
use crate::pairing::{PairingQueue, ServerPairings};
use crate::params::PlacementParams;
use crate::settings::PlacementSettings;
use crate::usage::ServerUsage;
use crate::validate::{check_tag_sizes, validate_params, TagMembership};
use crate::yielder::{Interruptor, LongCalculationYielder, Scheduler, TokioScheduler};

/// Generates table configurations against a cluster directory.
///
/// # Example
///
/// ```no_run
/// use corelib::ShardScheme;
/// use replication::{CancelSignal, PlacementParams, StaticDirectory, TableConfigGenerator};
///
/// # async fn run(directory: StaticDirectory) -> replication::Result<()> {
/// let params = PlacementParams::new(4, "default").with_replicas("default", 3);
/// let scheme = ShardScheme::uniform(4).unwrap();
/// let config = TableConfigGenerator::new(directory)
///     .generate(&params, &scheme, &Default::default(), None, &CancelSignal::new())
///     .await?;
/// assert_eq!(config.num_shards(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TableConfigGenerator<D, S = TokioScheduler> {
    directory: D,
    scheduler: S,
    settings: PlacementSettings,
}

impl<D: ClusterDirectory> TableConfigGenerator<D, TokioScheduler> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            scheduler: TokioScheduler,
            settings: PlacementSettings::default(),
        }
    }
}

impl<D: ClusterDirectory, S: Scheduler> TableConfigGenerator<D, S> {
    pub fn with_scheduler<T: Scheduler>(self, scheduler: T) -> TableConfigGenerator<D, T> {
        TableConfigGenerator {
            directory: self.directory,
            scheduler,
            settings: self.settings,
        }
    }

    pub fn with_settings(mut self, settings: PlacementSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn settings(&self) -> &PlacementSettings {
        &self.settings
    }

    /// Runs every check `generate` performs before assigning anything and
    /// returns the tag membership it validated against.
    pub fn validate(&self, params: &PlacementParams) -> Result<TagMembership> {
        self.settings.validate()?;
        let servers_with_tags = capture_tag_membership(&self.directory, params.referenced_tags());
        validate_params(params, &servers_with_tags, self.settings.max_shards)?;
        check_tag_sizes(params, &servers_with_tags)?;
        Ok(servers_with_tags)
    }

    /// Computes a placement for a table.
    ///
    /// `table_id` is `None` for a table that does not exist yet; every
    /// backfill cost is then 0. `server_usage` is the load other tables put
    /// on each server and is only read.
    pub async fn generate(
        &self,
        params: &PlacementParams,
        shard_scheme: &ShardScheme,
        server_usage: &ServerUsage,
        table_id: Option<TableId>,
        interruptor: &dyn Interruptor,
    ) -> Result<TableConfig> {
        let mut yielder =
            LongCalculationYielder::new(&self.scheduler, self.settings.yield_interval());

        info!(
            num_shards = params.num_shards,
            director_tag = %params.director_tag,
            existing_table = table_id.is_some(),
            "generating table configuration"
        );

        // The tag lists may change at any time; validation and assignment
        // must both use this one copy.
        let servers_with_tags = self.validate(params)?;
        if shard_scheme.num_shards() != params.num_shards {
            return Err(PlacementError::ShardSchemeMismatch {
                expected: params.num_shards,
                actual: shard_scheme.num_shards(),
            });
        }

        let snapshot = table_id
            .map(|table| DirectorySnapshot::capture(&self.directory, table, &servers_with_tags))
            .transpose()?;

        yielder.maybe_yield(interruptor).await?;

        let ranges: Vec<KeyRange> = shard_scheme.ranges().collect();
        let mut shards = vec![ShardDraft::default(); params.num_shards];

        for (tag, num_replicas) in params.active_tags() {
            let members = servers_with_tags.get(tag).ok_or_else(|| {
                PlacementError::InternalInconsistency(format!("no membership captured for `{tag}`"))
            })?;
            let is_director_tag = *tag == params.director_tag;
            debug!(
                tag = %tag,
                members = members.len(),
                replicas = num_replicas,
                is_director_tag,
                "placing tag"
            );

            let mut candidates = BTreeMap::new();
            for server in members {
                let mut group = ServerPairings::new(
                    server.clone(),
                    server_usage.get(server).copied().unwrap_or(0),
                );
                let report = snapshot.as_ref().and_then(|s| s.report(server));
                for (shard, range) in ranges.iter().enumerate() {
                    let cost = match &snapshot {
                        // Nothing to copy for a table that does not exist yet
                        None => 0.0,
                        Some(_) => backfill_cost(report, range),
                    };
                    group.add_pairing(shard, cost);
                }
                candidates.insert(server.clone(), group);
                yielder.maybe_yield(interruptor).await?;
            }

            // Directors are picked in a round of their own so that they end
            // up on different servers whenever possible.
            if is_director_tag {
                let round = Round {
                    num_shards: params.num_shards,
                    replicas_per_shard: 1,
                    usage_cost: self.settings.primary_usage_cost,
                };
                let queue: PairingQueue = candidates.values().cloned().collect();
                let mut directors = Vec::with_capacity(params.num_shards);
                pick_best_pairings(round, queue, &mut yielder, interruptor, |shard, server| {
                    shards[shard].directors.push(server.clone());
                    shards[shard].replicas.insert(server.clone());
                    directors.push((shard, server.clone()));
                })
                .await?;

                // Carry the directors' load into the replica round, and never
                // offer a director its own shard again.
                for (shard, server) in directors {
                    if let Some(group) = candidates.get_mut(&server) {
                        group.self_usage_cost += self.settings.primary_usage_cost;
                        group.remove_shard(shard);
                    }
                }
            }

            let round = Round {
                num_shards: params.num_shards,
                replicas_per_shard: num_replicas - usize::from(is_director_tag),
                usage_cost: self.settings.secondary_usage_cost,
            };
            let queue: PairingQueue = candidates.into_values().collect();
            pick_best_pairings(round, queue, &mut yielder, interruptor, |shard, server| {
                shards[shard].replicas.insert(server.clone());
            })
            .await?;
        }

        let config = finish(shards, params.total_replicas())?;
        info!(
            shards = config.num_shards(),
            servers = config.servers().len(),
            yields = yielder.yields(),
            "generated table configuration"
        );
        Ok(config)
    }
}

/// Computes a placement with the Tokio scheduler and default settings.
pub async fn generate_table_config<D>(
    directory: &D,
    params: &PlacementParams,
    shard_scheme: &ShardScheme,
    server_usage: &ServerUsage,
    table_id: Option<TableId>,
    interruptor: &dyn Interruptor,
) -> Result<TableConfig>
where
    D: ClusterDirectory + ?Sized,
{
    TableConfigGenerator::new(directory)
        .generate(params, shard_scheme, server_usage, table_id, interruptor)
        .await
}

/// A shard while placement is in progress.
#[derive(Debug, Clone, Default)]
struct ShardDraft {
    directors: Vec<ServerName>,
    replicas: BTreeSet<ServerName>,
}

fn finish(shards: Vec<ShardDraft>, total_replicas: usize) -> Result<TableConfig> {
    let shards = shards
        .into_iter()
        .enumerate()
        .map(|(index, mut draft)| {
            if draft.directors.len() != 1 {
                return Err(PlacementError::InternalInconsistency(format!(
                    "shard {index} has {} directors",
                    draft.directors.len()
                )));
            }
            if draft.replicas.len() != total_replicas {
                return Err(PlacementError::InternalInconsistency(format!(
                    "shard {index} has {} replicas, expected {total_replicas}",
                    draft.replicas.len()
                )));
            }
            let director = draft.directors.remove(0);
            if !draft.replicas.contains(&director) {
                return Err(PlacementError::InternalInconsistency(format!(
                    "director `{director}` of shard {index} is not one of its replicas"
                )));
            }
            Ok(ShardConfig {
                director,
                replicas: draft.replicas,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TableConfig { shards })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(directors: &[&str], replicas: &[&str]) -> ShardDraft {
        ShardDraft {
            directors: directors.iter().map(|&d| d.into()).collect(),
            replicas: replicas.iter().map(|&r| r.into()).collect(),
        }
    }

    #[test]
    fn test_finish_accepts_consistent_drafts() {
        let config = finish(vec![draft(&["a"], &["a", "b"]), draft(&["b"], &["a", "b"])], 2)
            .unwrap();
        assert_eq!(config.shards[1].director.as_str(), "b");
    }

    #[test]
    fn test_finish_rejects_broken_drafts() {
        let cases = [
            draft(&[], &["a", "b"]),
            draft(&["a", "b"], &["a", "b"]),
            draft(&["a"], &["a"]),
            draft(&["c"], &["a", "b"]),
        ];
        for case in cases {
            let err = finish(vec![case], 2).unwrap_err();
            assert!(matches!(err, PlacementError::InternalInconsistency(_)));
        }
    }
}
