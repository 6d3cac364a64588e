//! Delay calibrator.
//!
//! Each confirmed pool vote is compared against the other curators on the
//! same post. When someone did clearly better, the member's vote delay moves
//! 5% of the way toward the delay that curator used.

use sbi_chain::types::Content;
use sbi_types::{clamp_upvote_delay, AccountName, MemberState};

/// Another curator must beat our performance by this factor to matter.
pub const OUTPERFORMANCE_FACTOR: f64 = 1.05;
/// Weight of the current delay in the moving average.
const DELAY_HISTORY_WEIGHT: f64 = 19.0;
/// Only votes at least this fraction of ours count as comparable.
const COMPARABLE_VOTE_FRACTION: f64 = 0.5;
/// Curators receive this share of a post's payout.
const CURATION_SHARE: f64 = 0.5;

/// Curation performance of our vote and the best comparable one.
#[derive(Clone, Debug, PartialEq)]
pub struct CurationAnalysis {
    pub own_rshares: i64,
    /// Seconds between post creation and our vote.
    pub own_delay: f64,
    pub own_performance: f64,
    pub best_performance: f64,
    /// Seconds between post creation and the best vote, when one was found.
    pub best_delay: Option<f64>,
}

/// New vote delay for `member` after one observation.
pub fn recalibrate(
    member: &MemberState,
    own_performance: f64,
    best_performance: f64,
    best_delay: f64,
) -> f64 {
    let old = member.upvote_delay;
    if best_performance > 0.0 && best_performance >= own_performance * OUTPERFORMANCE_FACTOR {
        clamp_upvote_delay((old * DELAY_HISTORY_WEIGHT + best_delay) / (DELAY_HISTORY_WEIGHT + 1.0))
    } else {
        clamp_upvote_delay(old)
    }
}

/// Compare `voter`'s vote on `content` against every comparable vote.
///
/// A vote's curation reward is its weight share of half the pending payout;
/// performance is that reward over the vote's own value, in percent.
/// `rshares_to_fiat` values a vote in the same unit as the payout.
/// Returns `None` when `voter` has no vote on the post.
pub fn analyze_votes<F>(
    content: &Content,
    voter: &AccountName,
    rshares_to_fiat: F,
) -> Option<CurationAnalysis>
where
    F: Fn(i64) -> f64,
{
    let own = content.active_votes.iter().find(|v| &v.voter == voter)?;
    let total_weight = content.total_vote_weight as f64;

    let performance = |rshares: i64, weight: u64| -> f64 {
        let value = rshares_to_fiat(rshares);
        if value <= 0.0 || total_weight <= 0.0 {
            return 0.0;
        }
        let curation = content.pending_payout_value * CURATION_SHARE * weight as f64 / total_weight;
        curation / value * 100.0
    };

    let mut analysis = CurationAnalysis {
        own_rshares: own.rshares,
        own_delay: content.created.elapsed_since(own.time) as f64,
        own_performance: performance(own.rshares, own.weight),
        best_performance: 0.0,
        best_delay: None,
    };

    let floor = own.rshares as f64 * COMPARABLE_VOTE_FRACTION;
    for vote in &content.active_votes {
        if vote.rshares as f64 <= floor {
            continue;
        }
        let p = performance(vote.rshares, vote.weight);
        if p > analysis.best_performance {
            analysis.best_performance = p;
            analysis.best_delay = Some(content.created.elapsed_since(vote.time) as f64);
        }
    }
    Some(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_types::member::UPVOTE_DELAY_MAX_SECS;
    use sbi_types::{ActiveVote, Authorperm, Timestamp};

    fn member_with_delay(delay: f64) -> MemberState {
        let mut m = MemberState::new(AccountName::new("alice"));
        m.upvote_delay = delay;
        m
    }

    fn vote(voter: &str, rshares: i64, weight: u64, at: u64) -> ActiveVote {
        ActiveVote {
            voter: voter.into(),
            rshares,
            weight,
            percent: 10_000,
            time: Timestamp::new(at),
        }
    }

    #[test]
    fn better_curator_pulls_delay_toward_it() {
        let m = member_with_delay(300.0);
        // (300 * 19 + 100) / 20 = 290
        assert_eq!(recalibrate(&m, 10.0, 20.0, 100.0), 290.0);
    }

    #[test]
    fn marginal_improvement_is_ignored() {
        let m = member_with_delay(250.0);
        assert_eq!(recalibrate(&m, 10.0, 10.4, 100.0), 250.0);
    }

    #[test]
    fn result_stays_clamped() {
        let m = member_with_delay(100.0);
        assert_eq!(recalibrate(&m, 1.0, 50.0, 0.0), 100.0);
        let m = member_with_delay(300.0);
        assert_eq!(recalibrate(&m, 1.0, 50.0, 10_000.0), UPVOTE_DELAY_MAX_SECS);
    }

    #[test]
    fn no_performance_data_leaves_delay_alone() {
        let m = member_with_delay(200.0);
        assert_eq!(recalibrate(&m, 0.0, 0.0, 0.0), 200.0);
    }

    #[test]
    fn analysis_only_compares_similar_votes() {
        let content = Content {
            authorperm: Authorperm::new("alice", "p"),
            created: Timestamp::new(1_000),
            parent_author: String::new(),
            tags: vec![],
            app: None,
            body: String::new(),
            pending_payout_value: 10.0,
            total_vote_weight: 400,
            active_votes: vec![
                vote("early-bird", 1_000, 200, 1_060),
                vote("pool", 1_000, 100, 1_240),
                // Tiny vote with a huge weight share is not comparable.
                vote("dust", 100, 100, 1_010),
            ],
        };
        let a = analyze_votes(&content, &AccountName::new("pool"), |r| r as f64 / 1_000.0).unwrap();
        // Our curation: 10 * 0.5 * 100 / 400 = 1.25 on a vote worth 1.0.
        assert!((a.own_performance - 125.0).abs() < 1e-9);
        assert!((a.best_performance - 250.0).abs() < 1e-9);
        assert_eq!(a.best_delay, Some(60.0));
        assert_eq!(a.own_delay, 240.0);
    }

    #[test]
    fn missing_vote_yields_none() {
        let content = Content {
            authorperm: Authorperm::new("alice", "p"),
            created: Timestamp::new(0),
            parent_author: String::new(),
            tags: vec![],
            app: None,
            body: String::new(),
            pending_payout_value: 1.0,
            total_vote_weight: 0,
            active_votes: vec![],
        };
        assert!(analyze_votes(&content, &AccountName::new("pool"), |r| r as f64).is_none());
    }
}
