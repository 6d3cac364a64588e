//! Vote scheduling for the reward service.
//!
//! Turns a member's payable balance into one or more votes from the
//! service's voter accounts, delivers them with bounded retries, and tunes
//! each member's vote timing from observed curation performance.

pub mod calibrator;
pub mod delivery;
pub mod error;
pub mod planner;
pub mod pool;
pub mod scheduler;
pub mod targets;

pub use calibrator::{analyze_votes, recalibrate, CurationAnalysis, OUTPERFORMANCE_FACTOR};
pub use delivery::{DeliveryConfig, DeliveryState, VoteSubmitter};
pub use error::VotingError;
pub use planner::{plan_votes, select_fast_path, select_pool_voter, PlannedVote, MIN_VOTE_PCT};
pub use pool::VoterPool;
pub use scheduler::{PostPayout, VoteScheduler};
pub use targets::{payout_target, schedule_check, SkipReason};
