use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters for the dispatch-collect confirmation engine.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct CollectConfig {
    /// Default timeout (milliseconds) for one confirmation round. A session
    /// still pending when the timeout fires resolves to failure.
    #[serde(default = "default_collect_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_collect_timeout_ms(),
        }
    }
}

impl CollectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms < 1 {
            return Err(Error::Config(ConfigError::Message(
                "default_timeout_ms must be at least 1ms".into(),
            )));
        }
        Ok(())
    }
}

// in ms
fn default_collect_timeout_ms() -> u64 {
    15_000
}
