//! Placement request parameters.

use corelib::ServerTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the caller asks for: how many shards, how many replicas on each tag,
/// and which tag the directors come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementParams {
    pub num_shards: usize,
    pub num_replicas: BTreeMap<ServerTag, usize>,
    pub director_tag: ServerTag,
}

impl PlacementParams {
    pub fn new(num_shards: usize, director_tag: impl Into<ServerTag>) -> Self {
        Self {
            num_shards,
            num_replicas: BTreeMap::new(),
            director_tag: director_tag.into(),
        }
    }

    /// Requests `count` replicas on servers tagged `tag`.
    pub fn with_replicas(mut self, tag: impl Into<ServerTag>, count: usize) -> Self {
        self.num_replicas.insert(tag.into(), count);
        self
    }

    /// Replicas requested on `tag` (0 if absent).
    pub fn replicas_for(&self, tag: &ServerTag) -> usize {
        self.num_replicas.get(tag).copied().unwrap_or(0)
    }

    /// Tags with a non-zero replica count, in tag order.
    pub fn active_tags(&self) -> impl Iterator<Item = (&ServerTag, usize)> {
        self.num_replicas
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(tag, &count)| (tag, count))
    }

    /// Replicas every shard ends up with.
    pub fn total_replicas(&self) -> usize {
        self.active_tags().map(|(_, count)| count).sum()
    }

    /// Every tag whose membership placement needs: all requested tags plus
    /// the director tag.
    pub fn referenced_tags(&self) -> impl Iterator<Item = &ServerTag> {
        let director = (!self.num_replicas.contains_key(&self.director_tag))
            .then_some(&self.director_tag);
        self.num_replicas.keys().chain(director)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_skip_zero_counts() {
        let params = PlacementParams::new(4, "primary")
            .with_replicas("primary", 2)
            .with_replicas("backup", 1)
            .with_replicas("archive", 0);
        assert_eq!(params.total_replicas(), 3);
        assert_eq!(params.active_tags().count(), 2);
        assert_eq!(params.replicas_for(&"missing".into()), 0);
    }

    #[test]
    fn test_referenced_tags_include_director() {
        let params = PlacementParams::new(1, "primary").with_replicas("backup", 1);
        let tags: Vec<&str> = params.referenced_tags().map(|t| t.as_str()).collect();
        assert_eq!(tags, vec!["backup", "primary"]);
    }
}
