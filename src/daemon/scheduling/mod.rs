//! The capture loop. Each cycle waits a random delay, captures, then waits a fixed delay, so
//! capture times can't be predicted while the gap between two captures stays bounded.

pub mod config;
pub mod jitter;
pub mod scheduler;
