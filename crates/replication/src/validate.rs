//! Request validation.
//!
//! Rejects placement requests that are impossible or ambiguous before any
//! work is done. Checks run in a fixed order and stop at the first failure.

use corelib::{ServerName, ServerTag};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PlacementError, Result};
use crate::params::PlacementParams;

/// Membership of every tag a request refers to, captured once per request.
pub type TagMembership = BTreeMap<ServerTag, BTreeSet<ServerName>>;

/// Checks `params` against the shard ceiling and the tag membership snapshot.
pub fn validate_params(
    params: &PlacementParams,
    servers_with_tags: &TagMembership,
    max_shards: usize,
) -> Result<()> {
    if params.num_shards == 0 || params.num_shards > max_shards {
        return Err(PlacementError::InvalidShardCount {
            requested: params.num_shards,
            max: max_shards,
        });
    }

    if params.replicas_for(&params.director_tag) == 0 {
        return Err(PlacementError::DirectorTagUnderReplicated {
            tag: params.director_tag.clone(),
        });
    }

    let mut servers_claimed: BTreeMap<&ServerName, &ServerTag> = BTreeMap::new();
    for (tag, _) in params.active_tags() {
        let Some(members) = servers_with_tags.get(tag) else {
            continue;
        };
        for server in members {
            if let Some(&claimed_by) = servers_claimed.get(server) {
                return Err(PlacementError::OverlappingTags {
                    first: tag.clone(),
                    second: claimed_by.clone(),
                    server: server.clone(),
                });
            }
            servers_claimed.insert(server, tag);
        }
    }

    Ok(())
}

/// Fails with `InsufficientServers` for the first tag that has fewer members
/// than replicas requested on it.
pub fn check_tag_sizes(params: &PlacementParams, servers_with_tags: &TagMembership) -> Result<()> {
    for (tag, requested) in params.active_tags() {
        let available = servers_with_tags.get(tag).map_or(0, BTreeSet::len);
        if available < requested {
            return Err(PlacementError::InsufficientServers {
                tag: tag.clone(),
                requested,
                available,
            });
        }
    }
    Ok(())
}
