//! Fundamental types for the basic-income reward service.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: account identifiers, timestamps, ledger events, member state,
//! delegation records, voter capacity and reward parameters.

pub mod account;
pub mod delegation;
pub mod error;
pub mod event;
pub mod member;
pub mod params;
pub mod time;
pub mod vote;

pub use account::{AccountName, Authorperm};
pub use delegation::DelegationRecord;
pub use error::TypesError;
pub use event::{EventStatus, LedgerEvent, ShareType};
pub use member::{clamp_upvote_delay, MemberState, ShareAgeSample};
pub use params::RewardParams;
pub use time::Timestamp;
pub use vote::{
    ActiveVote, CurationSample, PendingPost, ScheduledVote, VoteOutcome, VoterCapacity,
};
