//! CLI subcommands and the scenario file format.
//!
//! A scenario is a JSON document describing a cluster and a placement
//! request:
//!
//! ```json
//! {
//!   "params": {"num_shards": 4, "num_replicas": {"default": 2}, "director_tag": "default"},
//!   "table_id": "00000000000000000000000000000042",
//!   "split_points": [1000, 2000, 3000],
//!   "server_usage": {"s1": 16},
//!   "settings": {"yield_interval_ms": 10},
//!   "directory": {"servers": [{"id": "1", "name": "s1", "tags": ["default"]}]}
//! }
//! ```
//!
//! Everything except `params` and `directory` is optional. Without
//! `split_points` the key space is split uniformly; without `table_id` the
//! table is treated as new.

use anyhow::Context;
use clap::Subcommand;
use corelib::{ShardScheme, TableConfig, TableId};
use replication::{
    calculate_server_usage, CancelSignal, PlacementParams, PlacementSettings, ServerUsage,
    StaticDirectory, TableConfigGenerator,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute a table configuration for a scenario.
    Generate { scenario: PathBuf },
    /// Check a scenario's request without placing anything.
    Validate { scenario: PathBuf },
    /// Sum the load existing table configurations put on each server.
    Usage {
        #[arg(required = true)]
        configs: Vec<PathBuf>,
        /// JSON placement settings (usage costs); defaults apply otherwise.
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

/// Output of a command.
#[derive(Debug)]
pub enum CommandResult {
    Config(TableConfig),
    Valid { tags: usize, servers: usize },
    Usage(ServerUsage),
}

impl CommandResult {
    pub fn render(&self) -> anyhow::Result<String> {
        Ok(match self {
            CommandResult::Config(config) => serde_json::to_string_pretty(config)?,
            CommandResult::Valid { tags, servers } => {
                format!("ok: {tags} tags, {servers} servers")
            }
            CommandResult::Usage(usage) => serde_json::to_string_pretty(usage)?,
        })
    }
}

/// A placement request together with the cluster it runs against.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub params: PlacementParams,
    #[serde(default)]
    pub settings: PlacementSettings,
    #[serde(default)]
    pub split_points: Option<Vec<u64>>,
    #[serde(default)]
    pub table_id: Option<TableId>,
    #[serde(default)]
    pub server_usage: ServerUsage,
    pub directory: StaticDirectory,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scenario '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid scenario '{}'", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn shard_scheme(&self) -> corelib::Result<ShardScheme> {
        match &self.split_points {
            Some(points) => ShardScheme::from_split_points(points.clone()),
            None => ShardScheme::uniform(self.params.num_shards.max(1)),
        }
    }

    fn generator(&self) -> TableConfigGenerator<&StaticDirectory> {
        TableConfigGenerator::new(&self.directory).with_settings(self.settings.clone())
    }

    /// Runs placement; Ctrl-C cancels it.
    pub async fn generate(&self) -> anyhow::Result<TableConfig> {
        // The shard count must be checked before a uniform scheme is sized by it
        self.generator().validate(&self.params)?;
        let scheme = self.shard_scheme()?;
        let cancel = CancelSignal::new();
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling placement");
                on_interrupt.signal();
            }
        });

        let result = self
            .generator()
            .generate(&self.params, &scheme, &self.server_usage, self.table_id, &cancel)
            .await;
        watcher.abort();
        Ok(result?)
    }
}

impl Command {
    pub async fn execute(self) -> anyhow::Result<CommandResult> {
        match self {
            Command::Generate { scenario } => {
                let scenario = Scenario::load(&scenario)?;
                let config = scenario.generate().await?;
                info!(shards = config.num_shards(), "placement complete");
                Ok(CommandResult::Config(config))
            }
            Command::Validate { scenario } => {
                let scenario = Scenario::load(&scenario)?;
                let membership = scenario.generator().validate(&scenario.params)?;
                let scheme = scenario.shard_scheme()?;
                anyhow::ensure!(
                    scheme.num_shards() == scenario.params.num_shards,
                    "shard scheme has {} shards but {} were requested",
                    scheme.num_shards(),
                    scenario.params.num_shards
                );
                Ok(CommandResult::Valid {
                    tags: membership.len(),
                    servers: membership.values().map(|s| s.len()).sum(),
                })
            }
            Command::Usage { configs, settings } => {
                let settings = match settings {
                    Some(path) => read_json::<PlacementSettings>(&path)?,
                    None => PlacementSettings::default(),
                };
                let mut usage = ServerUsage::new();
                for path in &configs {
                    let config: TableConfig = read_json(path)?;
                    calculate_server_usage(&config, &settings, &mut usage);
                }
                Ok(CommandResult::Usage(usage))
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in '{}'", path.display()))
}
