//! Takes screenshots at unpredictable moments and relays them to a small local service that keeps
//! the latest one around. The capture gap is randomized but bounded, so a capture is never more
//! than two intervals away.
//!

pub mod capture;
pub mod cli;
pub mod daemon;
pub mod error;
pub mod server;
pub mod storage;
pub mod utils;
