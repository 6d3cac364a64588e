//! Reward program parameters: the persisted configuration singleton.

use serde::{Deserialize, Serialize};

use crate::account::AccountName;

/// Tunable parameters of the reward program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    // ── Ledger ───────────────────────────────────────────────────────────
    /// Native stake units per bonus share.
    pub sp_share_ratio: f64,
    /// Minutes between ledger rebuild cycles.
    pub share_cycle_min: f64,
    /// rshares accrued per share per cycle.
    pub rshares_per_cycle: f64,
    /// rshares accrued per bonus share per cycle.
    #[serde(default = "default_del_rshares_per_cycle")]
    pub del_rshares_per_cycle: f64,
    #[serde(default = "default_upvote_multiplier")]
    pub upvote_multiplier: f64,

    // ── Scheduling ───────────────────────────────────────────────────────
    /// Smallest payout worth a root-post vote, in rshares.
    pub minimum_vote_threshold: f64,
    /// Divides the balance into a per-vote target.
    pub comment_vote_divider: f64,
    #[serde(default = "default_comment_vote_timeout_h")]
    pub comment_vote_timeout_h: f64,

    // ── Abuse ────────────────────────────────────────────────────────────
    /// Accounts known to sell votes.
    #[serde(default)]
    pub vote_selling_services: Vec<AccountName>,

    // ── Post filters ─────────────────────────────────────────────────────
    #[serde(default)]
    pub blacklist_tags: Vec<String>,
    #[serde(default)]
    pub blacklist_apps: Vec<String>,
    #[serde(default)]
    pub blacklist_body: Vec<String>,
}

fn default_del_rshares_per_cycle() -> f64 {
    800_000_000.0
}

fn default_upvote_multiplier() -> f64 {
    1.05
}

fn default_comment_vote_timeout_h() -> f64 {
    24.0
}

impl RewardParams {
    /// Reject parameter sets the ledger and scheduler cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("sp_share_ratio", self.sp_share_ratio),
            ("share_cycle_min", self.share_cycle_min),
            ("minimum_vote_threshold", self.minimum_vote_threshold),
            ("comment_vote_divider", self.comment_vote_divider),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{name} must be a positive number, got {value}"));
            }
        }
        let non_negative = [
            ("rshares_per_cycle", self.rshares_per_cycle),
            ("del_rshares_per_cycle", self.del_rshares_per_cycle),
            ("upvote_multiplier", self.upvote_multiplier),
            ("comment_vote_timeout_h", self.comment_vote_timeout_h),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} must be non-negative, got {value}"));
            }
        }
        Ok(())
    }

    pub fn is_vote_seller(&self, account: &AccountName) -> bool {
        self.vote_selling_services.iter().any(|s| s == account)
    }
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            sp_share_ratio: 2.0,
            share_cycle_min: 144.0,
            rshares_per_cycle: 800_000_000.0,
            del_rshares_per_cycle: default_del_rshares_per_cycle(),
            upvote_multiplier: default_upvote_multiplier(),
            minimum_vote_threshold: 300_000_000.0,
            comment_vote_divider: 2.0,
            comment_vote_timeout_h: default_comment_vote_timeout_h(),
            vote_selling_services: Vec::new(),
            blacklist_tags: Vec::new(),
            blacklist_apps: Vec::new(),
            blacklist_body: Vec::new(),
        }
    }
}
