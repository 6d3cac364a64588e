//! Payout targets and scheduling gates.

use std::fmt;

use sbi_types::time::{SECS_PER_DAY, SECS_PER_HOUR};
use sbi_types::{MemberState, PendingPost, RewardParams, Timestamp};

/// Minimum time between two payouts to the same member.
pub const VOTE_COOLDOWN_MINUTES: f64 = 15.0;
/// Subtracted from the member's vote delay to absorb block and stream lag.
pub const UPVOTE_DELAY_CORRECTION_SECS: f64 = 18.0;
/// Content older than this is past the useful voting window.
pub const MAX_POST_AGE_SECS: u64 = SECS_PER_DAY;
/// Comment targets must reach this multiple of the vote threshold.
pub const COMMENT_MIN_MULTIPLE: f64 = 2.0;
/// Comment targets are capped at this multiple of the vote threshold.
pub const COMMENT_MAX_MULTIPLE: f64 = 20.0;

/// Why a pending post was not paid.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    NotMember,
    Blacklisted,
    InvariantViolation(String),
    PostTooOld,
    CommentNotEligible,
    StaleComment,
    BelowThreshold { target: f64 },
    AlreadyVoted,
    TooEarly,
    RecentlyPaid,
    AlreadyPaidThisPass,
    NoCapacity,
}

impl SkipReason {
    /// Final reasons retire the post; the rest are retried on a later sweep.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            SkipReason::NotMember
                | SkipReason::PostTooOld
                | SkipReason::StaleComment
                | SkipReason::AlreadyVoted
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotMember => write!(f, "author is not a member"),
            SkipReason::Blacklisted => write!(f, "member is blacklisted"),
            SkipReason::InvariantViolation(why) => write!(f, "member record invalid: {why}"),
            SkipReason::PostTooOld => write!(f, "post is older than 24h"),
            SkipReason::CommentNotEligible => write!(f, "member comments are not eligible"),
            SkipReason::StaleComment => write!(f, "comment payout timed out"),
            SkipReason::BelowThreshold { target } => {
                write!(f, "target {target:.0} rshares below threshold")
            }
            SkipReason::AlreadyVoted => write!(f, "already voted by the pool"),
            SkipReason::TooEarly => write!(f, "vote delay not reached"),
            SkipReason::RecentlyPaid => write!(f, "member paid within cooldown"),
            SkipReason::AlreadyPaidThisPass => write!(f, "member already paid this pass"),
            SkipReason::NoCapacity => write!(f, "no voter has capacity"),
        }
    }
}

/// rshares owed to one piece of content.
///
/// Root posts get `balance / divider`. Comments get `balance / divider²`,
/// must clear twice the threshold and are capped at twenty times it.
pub fn payout_target(
    member: &MemberState,
    params: &RewardParams,
    main_post: bool,
) -> Result<f64, SkipReason> {
    let balance = member.balance_rshares as f64;
    let divider = params.comment_vote_divider;
    let threshold = params.minimum_vote_threshold;

    if main_post {
        let target = balance / divider;
        if target < threshold {
            return Err(SkipReason::BelowThreshold { target });
        }
        return Ok(target);
    }

    let target = balance / (divider * divider);
    if target < threshold * COMMENT_MIN_MULTIPLE {
        return Err(SkipReason::BelowThreshold { target });
    }
    Ok(target.min(threshold * COMMENT_MAX_MULTIPLE))
}

/// Every gate a post must pass before voters are selected. Returns the
/// payout target.
pub fn schedule_check(
    member: &MemberState,
    post: &PendingPost,
    params: &RewardParams,
    now: Timestamp,
) -> Result<f64, SkipReason> {
    let age_secs = post.created.elapsed_since(now);
    if age_secs > MAX_POST_AGE_SECS {
        return Err(SkipReason::PostTooOld);
    }
    if !post.main_post {
        let timeout = params.comment_vote_timeout_h * SECS_PER_HOUR as f64;
        if post.stale || age_secs as f64 > timeout {
            return Err(SkipReason::StaleComment);
        }
        if !member.comment_upvote {
            return Err(SkipReason::CommentNotEligible);
        }
    }

    if member.blacklisted {
        return Err(SkipReason::Blacklisted);
    }
    if let Some(why) = member.invariant_violation() {
        return Err(SkipReason::InvariantViolation(why));
    }

    let target = payout_target(member, params, post.main_post)?;

    if (age_secs as f64) < member.upvote_delay - UPVOTE_DELAY_CORRECTION_SECS {
        return Err(SkipReason::TooEarly);
    }
    if let Some(last) = member.last_received_vote {
        if last.elapsed_minutes(now) < VOTE_COOLDOWN_MINUTES {
            return Err(SkipReason::RecentlyPaid);
        }
    }

    Ok(target)
}
