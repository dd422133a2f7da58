//! Match Engine Error Hierarchy
//!
//! Defines the error types for the matchmaking and confirmation subsystems,
//! categorized by operational concern.
//!
//! Programming-invariant violations (duplicate-key enqueue, a reverse index
//! pointing at a queue that no longer holds the key, ticking the scheduler
//! with no job pool attached) indicate logic bugs and panic instead of
//! returning one of these variants.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Match queue registration and scheduling failures
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Strategy ID 0 is the reserved "none" value and can never carry an
    /// algorithm registration.
    #[error("strategy id {0} is reserved and cannot be registered")]
    ReservedStrategy(u32),

    /// Each strategy ID carries at most one algorithm registration.
    #[error("strategy id {0} is already registered")]
    DuplicateStrategy(u32),

    /// Shutdown channel closed before the signal could be delivered
    #[error("{0}")]
    SignalSendFailed(String),
}
