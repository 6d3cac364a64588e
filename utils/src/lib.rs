//! Shared utilities for the reward service.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use stats::PassStats;
pub use time::{format_duration, Clock, SystemClock};
