//! Configuration management for the match engine.
//!
//! Configuration is loaded from an optional TOML file and overlaid with
//! environment variables (highest priority). Every knob carries a serde
//! default so an empty source set still produces a runnable configuration.

mod collect;
mod match_queue;
pub use collect::*;
pub use match_queue::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Match queue tick pacing and scheduling parameters
    #[serde(default)]
    pub match_queue: MatchQueueConfig,

    /// Dispatch-collect confirmation parameters
    #[serde(default)]
    pub collect: CollectConfig,

    /// Directory the demo binary writes its log files into
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Settings {
    /// Load configuration with priority:
    /// 1. Hardcoded serde defaults
    /// 2. Optional TOML file (`config_path` argument, else `CONFIG_PATH` env var)
    /// 3. Environment variables prefixed with `QMATCH` (highest priority)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("QMATCH")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.match_queue.validate()?;
        self.collect.validate()?;
        Ok(())
    }
}

fn default_log_dir() -> String {
    "./logs".to_string()
}
