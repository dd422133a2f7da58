//! q-engine: a matchmaking and group-confirmation engine for online game
//! backends.
//!
//! Two tightly coupled subsystems share one control task:
//! - the match queue manager ([`MatchQueueMgr`]): keyed waiting queues,
//!   serving-node admission control, tick-paced dispatch of pluggable
//!   match/backfill algorithms to a worker pool, and reconciliation of the
//!   asynchronously computed results against live queue state;
//! - the dispatch-collect confirmation engine ([`DispatchCollectMgr`]):
//!   timed multi-party accept/refuse rounds resolved on unanimity, first
//!   refusal, or timeout.

mod collect;
mod config;
mod core;
mod errors;
mod metrics;
#[cfg(test)]
pub mod test_utils;
mod timer;
mod worker;

pub use crate::core::*;

pub use collect::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use timer::*;
pub use worker::*;
