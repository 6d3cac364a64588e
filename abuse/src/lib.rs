//! Abuse detection.
//!
//! Large fresh votes on member content are traced back to the transaction
//! that cast them. If any key that signed it belongs to a known
//! vote-selling service, the member bought the vote and is quarantined.

pub mod detector;
pub mod error;

pub use detector::{AbuseConfig, AbuseDetector, FlaggedService, BLOCK_SEARCH_OFFSETS};
pub use error::AbuseError;
