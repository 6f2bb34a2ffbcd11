//! File sink for checkpoints picked up by validators.

use serde_json;
use std::path::PathBuf;
use strand_bridge_tree::Checkpoint;
use tokio::fs;
use tracing::{debug, info};

/// Configuration for the checkpoint sink
#[derive(Debug, Clone)]
pub struct CheckpointSinkConfig {
    /// Output directory for the checkpoint JSON files
    pub output_dir: PathBuf,
    /// Number of checkpoints per shard directory
    pub shard_size: u32,
}

/// Sink writing each checkpoint to its own JSON file
pub struct CheckpointSink {
    config: CheckpointSinkConfig,
}

impl CheckpointSink {
    /// Create a new checkpoint sink with the given configuration
    pub async fn new(config: CheckpointSinkConfig) -> Result<Self, anyhow::Error> {
        anyhow::ensure!(config.shard_size > 0, "Shard size must be positive");
        fs::create_dir_all(&config.output_dir).await?;

        info!(
            "CheckpointSink initialized with output_dir: {:?}, shard_size: {}",
            config.output_dir, config.shard_size
        );

        Ok(Self { config })
    }

    /// Shard directory is named after the (exclusive) upper bound of its index range
    fn get_shard_dir(&self, index: u32) -> PathBuf {
        let shard_id = u64::from(index / self.config.shard_size);
        let shard_end = (shard_id + 1) * u64::from(self.config.shard_size);
        self.config.output_dir.join(format!("{shard_end}"))
    }

    pub fn get_file_path(&self, index: u32) -> PathBuf {
        self.get_shard_dir(index)
            .join(format!("checkpoint_{index}.json"))
    }

    pub async fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), anyhow::Error> {
        let file_path = self.get_file_path(checkpoint.merkle_index);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json_content = serde_json::to_string_pretty(checkpoint)?;
        fs::write(&file_path, json_content).await?;

        debug!(
            "Checkpoint {} written to {:?}",
            checkpoint.merkle_index, file_path
        );

        Ok(())
    }
}
