use std::collections::BTreeMap;

use proptest::prelude::*;

use sbi_ledger::{calc_share_age, DelegationResolver, MemberLedger};
use sbi_nullables::NullStore;
use sbi_store::{TransferLookup, TransferRecord};
use sbi_types::{AccountName, EventStatus, LedgerEvent, ShareAgeSample, ShareType, Timestamp};

const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn event(id: u64, sponsor: usize, shares: u64, sponsees: &[(usize, u64)], ts: u64) -> LedgerEvent {
    let map: BTreeMap<AccountName, u64> = sponsees
        .iter()
        .map(|(i, s)| (AccountName::new(NAMES[*i]), *s))
        .collect();
    LedgerEvent {
        event_id: id,
        share_type: ShareType::Sponsorship,
        status: EventStatus::Valid,
        account: AccountName::new(NAMES[sponsor]),
        sponsor: AccountName::new(NAMES[sponsor]),
        sponsee: LedgerEvent::encode_sponsee(&map),
        shares,
        vests: 0.0,
        memo: String::new(),
        timestamp: Timestamp::new(ts),
    }
}

fn arb_events() -> impl Strategy<Value = Vec<LedgerEvent>> {
    prop::collection::vec(
        (
            0usize..4,
            0u64..20,
            prop::collection::vec((0usize..4, 0u64..5), 0..3),
            0u64..1_000_000,
        ),
        0..30,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (sponsor, shares, sponsees, ts))| event(i as u64, sponsor, shares, &sponsees, ts))
            .collect()
    })
}

/// Expected shares per account: the sum of every valid sponsorship delta
/// naming it, counting only events that carry shares.
fn expected_shares(events: &[LedgerEvent]) -> BTreeMap<AccountName, i64> {
    let mut out = BTreeMap::new();
    for e in events.iter().filter(|e| e.shares > 0) {
        *out.entry(e.sponsor.clone()).or_insert(0) += e.shares as i64;
        for (a, s) in e.sponsee_map().unwrap() {
            if s > 0 {
                *out.entry(a).or_insert(0) += s as i64;
            }
        }
    }
    out
}

proptest! {
    /// Replaying the same log twice yields the same member state.
    #[test]
    fn rebuild_is_idempotent(events in arb_events()) {
        let mut ledger = MemberLedger::new([]);
        ledger.rebuild(&events, &BTreeMap::new());
        let first = ledger.members().clone();
        ledger.rebuild(&events, &BTreeMap::new());
        prop_assert_eq!(&first, ledger.members());
    }

    /// Shares equal the sum of sponsorship deltas, whatever the order.
    #[test]
    fn shares_are_conserved_under_reordering(events in arb_events(), seed in any::<u64>()) {
        let mut shuffled = events.clone();
        let n = shuffled.len();
        if n > 1 {
            let k = (seed % n as u64) as usize;
            shuffled.rotate_left(k);
            shuffled.reverse();
        }

        let expected = expected_shares(&events);
        for log in [&events, &shuffled] {
            let mut ledger = MemberLedger::new([]);
            ledger.rebuild(log, &BTreeMap::new());
            let got: BTreeMap<AccountName, i64> = ledger
                .members()
                .iter()
                .map(|(k, m)| (k.clone(), m.shares))
                .collect();
            prop_assert_eq!(&got, &expected);
        }
    }

    /// Share-age never decreases as the evaluation point moves forward.
    #[test]
    fn share_age_is_monotone(
        raw in prop::collection::vec((0u64..1_000_000, -5i64..20), 0..20),
        t1 in 0u64..2_000_000,
        dt in 0u64..1_000_000,
    ) {
        let samples: Vec<ShareAgeSample> = raw
            .into_iter()
            .map(|(ts, shares)| ShareAgeSample { timestamp: Timestamp::new(ts), shares })
            .collect();
        let a = calc_share_age(&samples, Timestamp::new(t1));
        let b = calc_share_age(&samples, Timestamp::new(t1 + dt));
        prop_assert!(b + 1e-9 >= a, "share age decreased: {} -> {}", a, b);
    }
}

#[test]
fn removed_delegation_leaves_no_bonus() {
    let mut sponsorship = event(1, 0, 10, &[], 100);
    sponsorship.sponsor = AccountName::new("m");
    sponsorship.account = AccountName::new("m");
    let mut delegated = sponsorship.clone();
    delegated.event_id = 2;
    delegated.share_type = ShareType::Delegation;
    delegated.shares = 0;
    delegated.vests = 1000.0;
    let mut removed = delegated.clone();
    removed.event_id = 3;
    removed.share_type = ShareType::RemovedDelegation;
    removed.vests = 0.0;
    let events = vec![sponsorship, delegated, removed];

    let store = NullStore::new();
    let resolution = DelegationResolver::new(AccountName::new("service"), 2.0)
        .unwrap()
        .resolve(&events, &store, |v| v, None)
        .unwrap();

    let mut ledger = MemberLedger::new([]);
    ledger.rebuild_with_delegations(&events, &BTreeMap::new(), &resolution.records());
    let m = ledger.get(&AccountName::new("m")).unwrap();
    assert_eq!(m.shares, 10);
    assert_eq!(m.bonus_shares, 0);
}

#[test]
fn leased_delegation_is_excluded() {
    let mut delegated = event(1, 0, 0, &[], 100);
    delegated.share_type = ShareType::Delegation;
    delegated.vests = 5000.0;

    let store = NullStore::new();
    store
        .put_transfer(&TransferRecord {
            trx_id: "lease".into(),
            from: AccountName::new("service"),
            to: AccountName::new("alice"),
            amount: 3.0,
            symbol: "HBD".into(),
            memo: "lease payment".into(),
            timestamp: Timestamp::new(200),
        })
        .unwrap();

    let resolution = DelegationResolver::new(AccountName::new("service"), 2.0)
        .unwrap()
        .resolve(&[delegated], &store, |v| v, None)
        .unwrap();
    assert_eq!(resolution.bonus_shares()[&AccountName::new("alice")], 0);
    assert_eq!(resolution.transitions.len(), 1);
}
