//! Replica placement for sharded tables.
//!
//! This crate computes a table configuration: for every shard, one director
//! and a set of replica servers, drawn from named server tags. It determines:
//! - Whether a request is satisfiable on the current cluster
//! - How expensive each (server, shard) placement is to bring up to date
//! - Which servers direct and replicate each shard, balancing load
//!
//! The computation is long-running on large clusters; it yields to the async
//! scheduler periodically and can be cancelled at every yield point.

pub mod backfill;
pub mod directory;
pub mod error;
pub mod generate;
pub mod greedy;
pub mod pairing;
pub mod params;
pub mod settings;
pub mod usage;
pub mod validate;
pub mod yielder;

pub use directory::{ClusterDirectory, DirectorySnapshot, StaticDirectory, StaticServer};
pub use error::{PlacementError, Result};
pub use generate::{generate_table_config, TableConfigGenerator};
pub use params::PlacementParams;
pub use settings::PlacementSettings;
pub use usage::{calculate_server_usage, ServerUsage};
pub use yielder::{CancelSignal, Interruptor, NeverInterrupt, Scheduler, TokioScheduler};
