use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Pacing parameters for the match queue manager.
///
/// The manager is driven by an external tick (one call to
/// [`crate::MatchQueueMgr::run`] per frame); these gaps are counted in ticks,
/// not wall time.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct MatchQueueConfig {
    /// Ticks between two scheduling passes. A queue is only re-examined once
    /// its previous pass (and any in-flight job) has been accounted for.
    #[serde(default = "default_match_tick_gap")]
    pub match_tick_gap: i64,

    /// Ticks between two diagnostic summaries of non-empty queues.
    #[serde(default = "default_show_match_tick_gap")]
    pub show_match_tick_gap: i64,

    /// Wall-time length of one engine tick in milliseconds. Only used by
    /// [`crate::MatchEngine`]; callers driving `run` themselves ignore it.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for MatchQueueConfig {
    fn default() -> Self {
        Self {
            match_tick_gap: default_match_tick_gap(),
            show_match_tick_gap: default_show_match_tick_gap(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl MatchQueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.match_tick_gap <= 0 {
            return Err(Error::Config(ConfigError::Message(
                "match_tick_gap must be greater than 0".into(),
            )));
        }
        if self.show_match_tick_gap <= 0 {
            return Err(Error::Config(ConfigError::Message(
                "show_match_tick_gap must be greater than 0".into(),
            )));
        }
        if self.tick_interval_ms < 1 {
            return Err(Error::Config(ConfigError::Message(
                "tick_interval_ms must be at least 1ms".into(),
            )));
        }
        Ok(())
    }
}

fn default_match_tick_gap() -> i64 {
    10
}
fn default_show_match_tick_gap() -> i64 {
    100
}
// in ms
fn default_tick_interval_ms() -> u64 {
    50
}
