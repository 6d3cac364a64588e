//! Voter capacity, scheduled votes and observed chain votes.

use serde::{Deserialize, Serialize};

use crate::account::{AccountName, Authorperm};
use crate::time::Timestamp;

/// Mana is spent at 2% of the full bar per 100% vote.
pub const MANA_PER_FULL_VOTE_DIVISOR: f64 = 50.0;

/// Snapshot of a voter account's regenerating vote budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterCapacity {
    pub account: AccountName,
    pub max_mana: f64,
    /// Current mana as a percentage of `max_mana` (0..=100).
    pub current_mana_pct: f64,
}

impl VoterCapacity {
    /// rshares a 100% vote from this account would deliver right now.
    pub fn available_rshares(&self) -> f64 {
        self.max_mana / MANA_PER_FULL_VOTE_DIVISOR * self.current_mana_pct / 100.0
    }

    /// Vote weight (percent) needed to deliver `rshares`. Infinite when empty.
    pub fn vote_percentage_for(&self, rshares: f64) -> f64 {
        let available = self.available_rshares();
        if available <= 0.0 {
            return f64::INFINITY;
        }
        rshares / available * 100.0
    }
}

/// Result of trying to deliver one scheduled vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Voted {
        delivered_rshares: i64,
        voted_at: Timestamp,
    },
    Skipped {
        reason: String,
    },
    Failed {
        attempts: u32,
    },
}

/// One vote the scheduler decided to cast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledVote {
    pub authorperm: Authorperm,
    pub voter: AccountName,
    pub vote_percentage: f64,
    pub target_rshares: f64,
    pub outcome: Option<VoteOutcome>,
}

/// A vote as reported by the chain for a post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveVote {
    pub voter: AccountName,
    pub rshares: i64,
    /// Curation weight assigned by the chain.
    pub weight: u64,
    /// Vote weight in basis points (10000 = 100%).
    pub percent: i64,
    pub time: Timestamp,
}

/// A member's post or comment awaiting a payout vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingPost {
    pub authorperm: Authorperm,
    pub author: AccountName,
    pub created: Timestamp,
    pub block: u64,
    pub main_post: bool,
    pub voted: bool,
    /// Filtered out by tag/app/body blocklists.
    pub skip: bool,
    /// Comment payout window elapsed.
    pub stale: bool,
    pub vote_delay: f64,
    /// Seconds between creation and the pool vote landing.
    pub voted_after: Option<f64>,
}

/// Curation performance observed for one pool vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurationSample {
    pub authorperm: Authorperm,
    pub member: AccountName,
    pub created: Timestamp,
    pub vote_rshares: i64,
    pub vote_delay: f64,
    pub performance: f64,
    pub best_performance: f64,
    pub best_time_delay: f64,
    pub updated: Timestamp,
}
