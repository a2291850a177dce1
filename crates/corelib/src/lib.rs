//! Core library for table replica placement.
//!
//! This crate provides the shared vocabulary of the placement engine:
//! - Server, tag and table identities
//! - Key space regions and shard schemes
//! - Per-server replication activity reports
//! - The table configuration produced by placement

pub mod activity;
pub mod error;
pub mod region;
pub mod server;
pub mod shard;
pub mod table_config;

pub use activity::{Activity, ActivityRecord, ActivityReport};
pub use error::{Error, Result};
pub use region::KeyRange;
pub use server::{ServerId, ServerName, ServerTag, TableId};
pub use shard::ShardScheme;
pub use table_config::{ShardConfig, TableConfig};
