//! Error types for replica placement.

use corelib::{ServerName, ServerTag};

/// Result type alias for placement operations.
pub type Result<T> = std::result::Result<T, PlacementError>;

/// Reasons a table configuration could not be generated.
///
/// Everything except `Cancelled` and `InternalInconsistency` is a problem with
/// the request or the cluster and is reported before any assignment work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("{}", shard_count_message(.requested, .max))]
    InvalidShardCount { requested: usize, max: usize },

    #[error(
        "Can't use server tag `{tag}` for directors because you specified no replicas in \
         server tag `{tag}`."
    )]
    DirectorTagUnderReplicated { tag: ServerTag },

    #[error(
        "Server tags `{first}` and `{second}` overlap; both contain server `{server}`. The \
         server tags used for replication settings for a given table must be non-overlapping."
    )]
    OverlappingTags {
        first: ServerTag,
        second: ServerTag,
        server: ServerName,
    },

    #[error(
        "You requested {requested} replicas on servers with the tag `{tag}`, but there are \
         only {available} servers with the tag `{tag}`. It's impossible to have more replicas \
         of the data than there are servers."
    )]
    InsufficientServers {
        tag: ServerTag,
        requested: usize,
        available: usize,
    },

    #[error("Can't configure table because server `{server}` is missing")]
    MissingServer { server: ServerName },

    #[error(
        "Cannot configure table because multiple servers are named `{server}`. Fix this name \
         collision and try again."
    )]
    AmbiguousServerName { server: ServerName },

    #[error("Shard scheme has {actual} shards but {expected} were requested")]
    ShardSchemeMismatch { expected: usize, actual: usize },

    #[error("Invalid placement settings: {0}")]
    InvalidSettings(String),

    #[error("Table configuration was interrupted")]
    Cancelled,

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl PlacementError {
    /// True for errors caused by the request or the state of the cluster.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            PlacementError::Cancelled | PlacementError::InternalInconsistency(_)
        )
    }
}

fn shard_count_message(requested: &usize, max: &usize) -> String {
    if *requested == 0 {
        "Every table must have at least one shard.".to_string()
    } else {
        format!("Maximum number of shards is {max}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_count_messages() {
        let zero = PlacementError::InvalidShardCount {
            requested: 0,
            max: 32,
        };
        assert_eq!(zero.to_string(), "Every table must have at least one shard.");
        let many = PlacementError::InvalidShardCount {
            requested: 33,
            max: 32,
        };
        assert_eq!(many.to_string(), "Maximum number of shards is 32.");
    }

    #[test]
    fn test_sizing_message_names_tag_and_counts() {
        let err = PlacementError::InsufficientServers {
            tag: "ssd".into(),
            requested: 5,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("`ssd`"));
        assert!(msg.contains("requested 5"));
        assert!(msg.contains("only 3"));
        assert!(err.is_user_error());
        assert!(!PlacementError::Cancelled.is_user_error());
    }
}
