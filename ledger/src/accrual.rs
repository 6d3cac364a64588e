//! Per-cycle balance accrual.

use sbi_types::{MemberState, RewardParams};

/// Totals credited in one accrual pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccrualReport {
    pub members: usize,
    pub subscribed_rshares: i64,
    pub delegation_rshares: i64,
}

fn scaled(units: i64, per_cycle: f64, multiplier: f64) -> i64 {
    let value = (units as f64 * per_cycle * multiplier).round();
    if value.is_finite() {
        value as i64
    } else {
        0
    }
}

/// Credit one cycle's worth of rshares to `member`.
///
/// Returns `(subscribed, delegation)` as credited. Both partitions and the
/// balance move together so the partition invariant holds.
pub fn accrue(member: &mut MemberState, params: &RewardParams) -> (i64, i64) {
    let subscribed = scaled(
        member.shares.max(0),
        params.rshares_per_cycle,
        params.upvote_multiplier,
    );
    let delegation = scaled(
        member.bonus_shares.max(0),
        params.del_rshares_per_cycle,
        params.upvote_multiplier,
    );
    member.subscribed_rshares += subscribed;
    member.delegation_rshares += delegation;
    member.balance_rshares += subscribed + delegation;
    (subscribed, delegation)
}

pub fn accrue_all<'a>(
    members: impl IntoIterator<Item = &'a mut MemberState>,
    params: &RewardParams,
) -> AccrualReport {
    let mut report = AccrualReport::default();
    for member in members {
        let (s, d) = accrue(member, params);
        report.members += 1;
        report.subscribed_rshares += s;
        report.delegation_rshares += d;
    }
    report
}

/// Credit rshares earned through curation.
pub fn credit_curation(member: &mut MemberState, rshares: i64) {
    member.curation_rshares += rshares;
    member.balance_rshares += rshares;
}

/// Credit rshares from any other source (manual grants, promotions).
pub fn credit_other(member: &mut MemberState, rshares: i64) {
    member.other_rshares += rshares;
    member.balance_rshares += rshares;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_types::AccountName;

    fn params() -> RewardParams {
        RewardParams {
            rshares_per_cycle: 1000.0,
            del_rshares_per_cycle: 100.0,
            upvote_multiplier: 1.05,
            ..RewardParams::default()
        }
    }

    #[test]
    fn accrues_both_partitions() {
        let mut m = MemberState::new(AccountName::new("alice"));
        m.shares = 3;
        m.bonus_shares = 2;
        let (s, d) = accrue(&mut m, &params());
        assert_eq!(s, 3150);
        assert_eq!(d, 210);
        assert_eq!(m.balance_rshares, 3360);
        assert!(m.invariant_violation().is_none());
    }

    #[test]
    fn credits_keep_invariant() {
        let mut m = MemberState::new(AccountName::new("alice"));
        credit_curation(&mut m, 40);
        credit_other(&mut m, 2);
        assert_eq!(m.balance_rshares, 42);
        assert!(m.invariant_violation().is_none());
    }

    #[test]
    fn accrue_all_sums() {
        let mut a = MemberState::new(AccountName::new("a"));
        a.shares = 1;
        let mut b = MemberState::new(AccountName::new("b"));
        b.bonus_shares = 1;
        let mut members = vec![a, b];
        let report = accrue_all(members.iter_mut(), &params());
        assert_eq!(report.members, 2);
        assert_eq!(report.subscribed_rshares, 1050);
        assert_eq!(report.delegation_rshares, 105);
    }
}
