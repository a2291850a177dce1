//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building core domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A key range whose end does not lie after its start.
    #[error("Invalid key range: [{start}, {end})")]
    InvalidKeyRange { start: u64, end: u64 },
    /// A shard scheme that cannot partition the key space.
    #[error("Invalid shard scheme: {0}")]
    InvalidShardScheme(String),
    /// Two activity records of one report cover the same part of the key space.
    #[error("Activity records overlap: {first} and {second}")]
    OverlappingActivities { first: String, second: String },
    /// An identifier that could not be parsed.
    #[error("Invalid id `{0}`: expected up to 32 hex digits")]
    InvalidId(String),
}
