//! Voter selection.
//!
//! Two rules, kept as separate code paths:
//!
//! * The fast path picks one voter that can cover the whole target alone,
//!   preferring the least drained account (highest mana percentage).
//! * The pool fallback drains the largest absolute capacity first, so the
//!   target is covered with as few votes as possible.

use sbi_types::{AccountName, VoterCapacity};

/// Smallest vote weight worth casting, in percent.
pub const MIN_VOTE_PCT: f64 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedVote {
    pub voter: AccountName,
    /// Vote weight in percent, `(MIN_VOTE_PCT, 100]`.
    pub percentage: f64,
    /// rshares this vote is expected to deliver.
    pub rshares: f64,
}

/// The single voter that can pay `target` alone, if any.
///
/// Ties on mana percentage go to the voter listed first.
pub fn select_fast_path(target: f64, capacities: &[VoterCapacity]) -> Option<PlannedVote> {
    let mut best: Option<&VoterCapacity> = None;
    for cap in capacities {
        if cap.available_rshares() <= target {
            continue;
        }
        if cap.vote_percentage_for(target) <= MIN_VOTE_PCT {
            continue;
        }
        if best.map_or(true, |b| cap.current_mana_pct > b.current_mana_pct) {
            best = Some(cap);
        }
    }
    best.map(|cap| PlannedVote {
        voter: cap.account.clone(),
        percentage: cap.vote_percentage_for(target),
        rshares: target,
    })
}

/// The next pool voter for a remaining `target`: the largest absolute
/// capacity, voting at most 100%.
///
/// Ties on capacity go to the voter listed first.
pub fn select_pool_voter(target: f64, capacities: &[VoterCapacity]) -> Option<PlannedVote> {
    if target <= 0.0 {
        return None;
    }
    let mut best: Option<(&VoterCapacity, f64)> = None;
    for cap in capacities {
        let available = cap.available_rshares();
        if available <= 0.0 {
            continue;
        }
        let percentage = cap.vote_percentage_for(target).min(100.0);
        if percentage <= MIN_VOTE_PCT {
            continue;
        }
        if best.map_or(true, |(_, b)| available > b) {
            best = Some((cap, available));
        }
    }
    best.map(|(cap, available)| {
        let percentage = cap.vote_percentage_for(target).min(100.0);
        PlannedVote {
            voter: cap.account.clone(),
            percentage,
            rshares: available * percentage / 100.0,
        }
    })
}

/// Plan every vote for `target` against a fixed capacity snapshot.
///
/// The live scheduler re-reads capacity between picks; this is the same
/// selection for a snapshot, used for dry runs and reasoning about plans.
pub fn plan_votes(target: f64, capacities: &[VoterCapacity]) -> Vec<PlannedVote> {
    if let Some(single) = select_fast_path(target, capacities) {
        return vec![single];
    }

    let mut remaining = target;
    let mut unused: Vec<VoterCapacity> = capacities.to_vec();
    let mut plan = Vec::new();
    while let Some(vote) = select_pool_voter(remaining, &unused) {
        remaining -= vote.rshares;
        unused.retain(|c| c.account != vote.voter);
        plan.push(vote);
        if remaining <= 0.0 {
            break;
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A voter whose full vote is worth `rshares` at `pct` mana.
    fn voter(name: &str, rshares: f64, pct: f64) -> VoterCapacity {
        VoterCapacity {
            account: AccountName::new(name),
            max_mana: rshares * 50.0 * 100.0 / pct,
            current_mana_pct: pct,
        }
    }

    #[test]
    fn fast_path_prefers_highest_mana_pct() {
        let caps = [voter("big", 1_000.0, 60.0), voter("fresh", 200.0, 95.0)];
        let vote = select_fast_path(100.0, &caps).unwrap();
        assert_eq!(vote.voter, AccountName::new("fresh"));
        assert!((vote.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn fast_path_ties_go_to_first_listed() {
        let caps = [voter("a", 500.0, 80.0), voter("b", 900.0, 80.0)];
        assert_eq!(select_fast_path(100.0, &caps).unwrap().voter, AccountName::new("a"));
    }

    #[test]
    fn fast_path_needs_strictly_more_capacity() {
        let caps = [voter("a", 100.0, 100.0)];
        assert!(select_fast_path(100.0, &caps).is_none());
    }

    #[test]
    fn fast_path_respects_granularity_floor() {
        let caps = [voter("huge", 1e12, 100.0)];
        assert!(select_fast_path(1.0, &caps).is_none());
    }

    #[test]
    fn pool_prefers_largest_absolute_capacity() {
        let caps = [voter("a", 50.0, 100.0), voter("b", 40.0, 20.0), voter("c", 60.0, 30.0)];
        let vote = select_pool_voter(120.0, &caps).unwrap();
        assert_eq!(vote.voter, AccountName::new("c"));
        assert_eq!(vote.percentage, 100.0);
        assert!((vote.rshares - 60.0).abs() < 1e-9);
    }

    #[test]
    fn pool_plan_covers_target() {
        let caps = [voter("a", 50.0, 100.0), voter("b", 40.0, 100.0), voter("c", 60.0, 100.0)];
        let plan = plan_votes(120.0, &caps);
        let order: Vec<&str> = plan.iter().map(|v| v.voter.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_eq!(plan[0].percentage, 100.0);
        assert_eq!(plan[1].percentage, 100.0);
        assert!((plan[2].percentage - 25.0).abs() < 1e-9);
        let delivered: f64 = plan.iter().map(|v| v.rshares).sum();
        assert!((delivered - 120.0).abs() < 1e-9);
    }

    #[test]
    fn pool_stops_when_capacity_runs_out() {
        let caps = [voter("a", 10.0, 100.0), voter("b", 20.0, 100.0)];
        let plan = plan_votes(100.0, &caps);
        assert_eq!(plan.len(), 2);
        let delivered: f64 = plan.iter().map(|v| v.rshares).sum();
        assert!((delivered - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_voters_are_ignored() {
        let caps = [voter("a", 50.0, 100.0), VoterCapacity {
            account: AccountName::new("dry"),
            max_mana: 1_000.0,
            current_mana_pct: 0.0,
        }];
        let plan = plan_votes(80.0, &caps);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].voter, AccountName::new("a"));
    }
}
