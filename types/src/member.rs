//! Per-member reward state.

use serde::{Deserialize, Serialize};

use crate::account::AccountName;
use crate::time::Timestamp;

/// Lower bound for the calibrated vote delay, in seconds.
pub const UPVOTE_DELAY_MIN_SECS: f64 = 100.0;
/// Upper bound for the calibrated vote delay, in seconds. Also the default.
pub const UPVOTE_DELAY_MAX_SECS: f64 = 300.0;

/// One change in a member's held shares, used for share-age integration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareAgeSample {
    pub timestamp: Timestamp,
    pub shares: i64,
}

/// Everything the service tracks about one participant.
///
/// `shares`, `bonus_shares` and the share-age samples are rebuilt from the
/// event log every cycle. The rshares partitions and vote bookkeeping are
/// carried over between cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberState {
    pub id: AccountName,
    pub shares: i64,
    pub bonus_shares: i64,
    pub share_age_samples: Vec<ShareAgeSample>,
    /// Integrated share-days at the last rebuild.
    pub share_age: f64,
    /// `share_age / total_shares`, in days.
    pub avg_share_age: f64,

    pub balance_rshares: i64,
    pub subscribed_rshares: i64,
    pub delegation_rshares: i64,
    pub curation_rshares: i64,
    pub other_rshares: i64,
    /// Lifetime rshares delivered to this member.
    pub rewarded_rshares: i64,

    pub upvote_delay: f64,
    pub last_received_vote: Option<Timestamp>,
    pub last_post: Option<Timestamp>,
    pub last_comment: Option<Timestamp>,
    pub latest_enrollment: Option<Timestamp>,
    /// When set, the member's comments are eligible for payout.
    pub comment_upvote: bool,
    pub sp_delegation_timestamp: Option<Timestamp>,

    pub blacklisted: bool,
    pub quarantine_reason: Option<String>,
    pub skip_rounds: u32,
}

impl MemberState {
    pub fn new(id: AccountName) -> Self {
        Self {
            id,
            shares: 0,
            bonus_shares: 0,
            share_age_samples: Vec::new(),
            share_age: 0.0,
            avg_share_age: 0.0,
            balance_rshares: 0,
            subscribed_rshares: 0,
            delegation_rshares: 0,
            curation_rshares: 0,
            other_rshares: 0,
            rewarded_rshares: 0,
            upvote_delay: UPVOTE_DELAY_MAX_SECS,
            last_received_vote: None,
            last_post: None,
            last_comment: None,
            latest_enrollment: None,
            comment_upvote: false,
            sp_delegation_timestamp: None,
            blacklisted: false,
            quarantine_reason: None,
            skip_rounds: 0,
        }
    }

    pub fn total_shares(&self) -> i64 {
        self.shares + self.bonus_shares
    }

    pub fn append_share_age(&mut self, timestamp: Timestamp, shares: i64) {
        self.share_age_samples.push(ShareAgeSample { timestamp, shares });
    }

    /// Clears the share-age history without touching `shares`.
    pub fn reset_share_age_list(&mut self) {
        self.share_age_samples.clear();
        self.share_age = 0.0;
        self.avg_share_age = 0.0;
    }

    /// Set the vote delay, clamped to the allowed window.
    pub fn set_upvote_delay(&mut self, secs: f64) {
        self.upvote_delay = clamp_upvote_delay(secs);
    }

    /// Sum of all provenance partitions minus lifetime payouts.
    pub fn partition_balance(&self) -> i64 {
        self.subscribed_rshares + self.delegation_rshares + self.curation_rshares
            + self.other_rshares
            - self.rewarded_rshares
    }

    /// Describes the first violated record invariant, if any.
    pub fn invariant_violation(&self) -> Option<String> {
        if self.shares < 0 || self.bonus_shares < 0 {
            return Some(format!(
                "negative shares ({} / {} bonus)",
                self.shares, self.bonus_shares
            ));
        }
        let expected = self.partition_balance();
        if expected != self.balance_rshares {
            return Some(format!(
                "balance {} does not match partitions {}",
                self.balance_rshares, expected
            ));
        }
        None
    }

    /// Put the member in quarantine.
    pub fn quarantine(&mut self, reason: impl Into<String>, skip_rounds: u32) {
        self.blacklisted = true;
        self.quarantine_reason = Some(reason.into());
        self.skip_rounds = skip_rounds;
    }

    /// Count one reward cycle off a running quarantine. Returns true when
    /// this round released the member. A blacklisting without a count is
    /// left alone.
    pub fn end_quarantine_round(&mut self) -> bool {
        if self.skip_rounds == 0 {
            return false;
        }
        self.skip_rounds -= 1;
        if self.skip_rounds > 0 {
            return false;
        }
        self.blacklisted = false;
        self.quarantine_reason = None;
        true
    }
}

/// Clamp a vote delay into `[UPVOTE_DELAY_MIN_SECS, UPVOTE_DELAY_MAX_SECS]`.
/// Non-finite input falls back to the default.
pub fn clamp_upvote_delay(secs: f64) -> f64 {
    if !secs.is_finite() {
        return UPVOTE_DELAY_MAX_SECS;
    }
    secs.clamp(UPVOTE_DELAY_MIN_SECS, UPVOTE_DELAY_MAX_SECS)
}
