mod elem;
mod engine;
mod job;
mod manager;
mod map_info;
mod queue;
mod scheduler;

pub use elem::*;
pub use engine::*;
pub use job::*;
pub use manager::*;
pub use map_info::*;
pub use queue::*;

#[cfg(test)]
mod scheduler_test;
