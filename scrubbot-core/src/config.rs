// File: scrubbot-core/src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use crate::Error;

/// Knobs for the clean commands. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Upper bound on messages traversed per channel.
    pub message_limit: usize,
    pub default_traverse: usize,
    pub response_delete_delay_secs: u64,
    pub cache_capacity: usize,
    pub mod_log_channel: Option<Id<ChannelMarker>>,
    pub mod_channels: Vec<Id<ChannelMarker>>,
    pub transcript_dir: PathBuf,
    pub command_prefix: String,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            message_limit: 10_000,
            default_traverse: 10,
            response_delete_delay_secs: 5,
            cache_capacity: 1_000,
            mod_log_channel: None,
            mod_channels: Vec::new(),
            transcript_dir: PathBuf::from("./transcripts"),
            command_prefix: "!".to_string(),
        }
    }
}

impl CleanConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.message_limit == 0 {
            return Err(Error::Config("message_limit must be positive".into()));
        }
        if self.default_traverse > self.message_limit {
            return Err(Error::Config(format!(
                "default_traverse ({}) exceeds message_limit ({})",
                self.default_traverse, self.message_limit
            )));
        }
        if self.command_prefix.is_empty() {
            return Err(Error::Config("command_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_mod_channel(&self, channel_id: Id<ChannelMarker>) -> bool {
        self.mod_channels.contains(&channel_id)
    }

    pub fn response_delete_delay(&self) -> Duration {
        Duration::from_secs(self.response_delete_delay_secs)
    }
}
