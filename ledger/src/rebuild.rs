//! Full replay of the event log into member shares.

use std::collections::BTreeMap;

use sbi_types::{
    AccountName, DelegationRecord, EventStatus, LedgerEvent, MemberState, ShareType, Timestamp,
};

/// An event that could not be applied and was left out of the replay.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedEvent {
    pub event_id: u64,
    pub reason: String,
}

/// What a rebuild did, for logging and progress tracking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebuildReport {
    pub applied: usize,
    pub skipped: Vec<SkippedEvent>,
    pub pruned: Vec<AccountName>,
    /// Newest event timestamp seen. Events may arrive out of time order.
    pub max_timestamp: Option<Timestamp>,
}

/// Owns member state for the duration of a cycle.
///
/// Built from the previous cycle's rows so that balances, vote bookkeeping
/// and quarantine flags carry over. Share counts and share-age samples are
/// always recomputed from the log.
pub struct MemberLedger {
    members: BTreeMap<AccountName, MemberState>,
}

impl MemberLedger {
    pub fn new(previous: impl IntoIterator<Item = MemberState>) -> Self {
        Self {
            members: previous.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn members(&self) -> &BTreeMap<AccountName, MemberState> {
        &self.members
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut MemberState> {
        self.members.values_mut()
    }

    pub fn get(&self, id: &AccountName) -> Option<&MemberState> {
        self.members.get(id)
    }

    pub fn into_members(self) -> Vec<MemberState> {
        self.members.into_values().collect()
    }

    /// Replay `events` and prune members left without shares.
    pub fn rebuild(
        &mut self,
        events: &[LedgerEvent],
        management_allocation: &BTreeMap<AccountName, u64>,
    ) -> RebuildReport {
        self.rebuild_with_delegations(events, management_allocation, &[])
    }

    /// Replay `events`, apply resolved delegations as bonus shares, then
    /// prune. Bonus shares must land before pruning so a delegator with no
    /// sponsored shares keeps its row.
    pub fn rebuild_with_delegations(
        &mut self,
        events: &[LedgerEvent],
        management_allocation: &BTreeMap<AccountName, u64>,
        delegations: &[DelegationRecord],
    ) -> RebuildReport {
        let mut report = self.replay(events, management_allocation);
        self.apply_delegations(delegations);
        report.pruned = self.prune();
        report
    }

    fn reset(&mut self) {
        for member in self.members.values_mut() {
            member.shares = 0;
            member.bonus_shares = 0;
            member.reset_share_age_list();
        }
    }

    fn member_entry(&mut self, id: &AccountName) -> &mut MemberState {
        self.members
            .entry(id.clone())
            .or_insert_with(|| MemberState::new(id.clone()))
    }

    fn credit(&mut self, id: &AccountName, shares: u64, timestamp: Timestamp) {
        let delta = shares as i64;
        let member = self.member_entry(id);
        member.shares += delta;
        member.append_share_age(timestamp, delta);
        if member.latest_enrollment.map_or(true, |t| t < timestamp) {
            member.latest_enrollment = Some(timestamp);
        }
    }

    fn replay(
        &mut self,
        events: &[LedgerEvent],
        management_allocation: &BTreeMap<AccountName, u64>,
    ) -> RebuildReport {
        self.reset();

        let mut report = RebuildReport::default();
        let mut management_applied = false;

        for event in events {
            report.max_timestamp = report.max_timestamp.max(Some(event.timestamp));

            if event.status != EventStatus::Valid {
                continue;
            }

            match event.share_type {
                ShareType::Mgmt | ShareType::MgmtTransfer => {
                    if management_applied {
                        continue;
                    }
                    management_applied = true;
                    for (account, &shares) in management_allocation {
                        let member = self.member_entry(account);
                        let delta = shares as i64 - member.shares;
                        member.shares = shares as i64;
                        member.append_share_age(event.timestamp, delta);
                    }
                    report.applied += 1;
                }
                ShareType::Sponsorship => {
                    if event.shares == 0 {
                        continue;
                    }
                    let sponsees = match event.sponsee_map() {
                        Ok(map) => map,
                        Err(e) => {
                            tracing::warn!(event_id = event.event_id, error = %e, "skipping event");
                            report.skipped.push(SkippedEvent {
                                event_id: event.event_id,
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    };
                    self.credit(&event.sponsor, event.shares, event.timestamp);
                    for (sponsee, &shares) in &sponsees {
                        if shares > 0 {
                            self.credit(sponsee, shares, event.timestamp);
                        }
                    }
                    report.applied += 1;
                }
                // Delegations are resolved separately; share transfers and
                // leased delegations carry no shares.
                ShareType::Delegation
                | ShareType::RemovedDelegation
                | ShareType::DelegationLeased
                | ShareType::ShareTransfer => {}
            }
        }

        report
    }

    /// Set bonus shares from resolved delegations. Accounts not listed keep
    /// the zero bonus set by the reset.
    pub fn apply_delegations(&mut self, delegations: &[DelegationRecord]) {
        for record in delegations {
            if record.removed {
                if let Some(member) = self.members.get_mut(&record.account) {
                    member.sp_delegation_timestamp = Some(record.observed_at);
                }
                continue;
            }
            if record.is_leased || record.bonus_shares <= 0 {
                continue;
            }
            let member = self.member_entry(&record.account);
            member.bonus_shares = record.bonus_shares;
            member.append_share_age(record.observed_at, record.bonus_shares);
        }
    }

    fn prune(&mut self) -> Vec<AccountName> {
        let pruned: Vec<AccountName> = self
            .members
            .values()
            .filter(|m| m.total_shares() <= 0)
            .map(|m| m.id.clone())
            .collect();
        for id in &pruned {
            self.members.remove(id);
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sponsorship(id: u64, sponsor: &str, shares: u64, sponsee: &str, ts: u64) -> LedgerEvent {
        LedgerEvent {
            event_id: id,
            share_type: ShareType::Sponsorship,
            status: EventStatus::Valid,
            account: AccountName::new(sponsor),
            sponsor: AccountName::new(sponsor),
            sponsee: sponsee.to_string(),
            shares,
            vests: 0.0,
            memo: String::new(),
            timestamp: Timestamp::new(ts),
        }
    }

    fn shares_of(ledger: &MemberLedger, id: &str) -> Option<i64> {
        ledger.get(&AccountName::new(id)).map(|m| m.shares)
    }

    #[test]
    fn sponsorship_credits_sponsor_and_sponsees() {
        let mut ledger = MemberLedger::new([]);
        let events = [sponsorship(1, "alice", 3, r#"{"bob": 1, "carol": 2}"#, 100)];
        let report = ledger.rebuild(&events, &BTreeMap::new());
        assert_eq!(report.applied, 1);
        assert_eq!(shares_of(&ledger, "alice"), Some(3));
        assert_eq!(shares_of(&ledger, "bob"), Some(1));
        assert_eq!(shares_of(&ledger, "carol"), Some(2));
        let bob = ledger.get(&AccountName::new("bob")).unwrap();
        assert_eq!(bob.share_age_samples.len(), 1);
        assert_eq!(bob.latest_enrollment, Some(Timestamp::new(100)));
    }

    #[test]
    fn non_valid_and_zero_share_events_are_ignored() {
        let mut ledger = MemberLedger::new([]);
        let mut pending = sponsorship(1, "alice", 3, "", 100);
        pending.status = EventStatus::LessOrNoSponsee;
        let zero = sponsorship(2, "bob", 0, r#"{"carol": 1}"#, 100);
        let report = ledger.rebuild(&[pending, zero], &BTreeMap::new());
        assert_eq!(report.applied, 0);
        assert!(ledger.members().is_empty());
    }

    #[test]
    fn malformed_sponsee_skips_only_that_event() {
        let mut ledger = MemberLedger::new([]);
        let events = [
            sponsorship(1, "alice", 3, "{not json", 100),
            sponsorship(2, "bob", 1, "", 200),
        ];
        let report = ledger.rebuild(&events, &BTreeMap::new());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].event_id, 1);
        assert_eq!(shares_of(&ledger, "alice"), None);
        assert_eq!(shares_of(&ledger, "bob"), Some(1));
    }

    #[test]
    fn management_allocation_applies_once_and_overwrites() {
        let mut ledger = MemberLedger::new([]);
        let mut mgmt = sponsorship(1, "service", 0, "", 50);
        mgmt.share_type = ShareType::Mgmt;
        let mut mgmt_again = mgmt.clone();
        mgmt_again.event_id = 2;
        mgmt_again.share_type = ShareType::MgmtTransfer;

        let allocation = BTreeMap::from([(AccountName::new("owner"), 40u64)]);
        ledger.rebuild(&[mgmt, mgmt_again], &allocation);
        assert_eq!(shares_of(&ledger, "owner"), Some(40));
    }

    #[test]
    fn tracks_max_timestamp_out_of_order() {
        let mut ledger = MemberLedger::new([]);
        let events = [
            sponsorship(1, "alice", 1, "", 500),
            sponsorship(2, "bob", 1, "", 100),
        ];
        let report = ledger.rebuild(&events, &BTreeMap::new());
        assert_eq!(report.max_timestamp, Some(Timestamp::new(500)));
    }

    #[test]
    fn rebuild_keeps_balances_but_recomputes_shares() {
        let mut previous = MemberState::new(AccountName::new("alice"));
        previous.shares = 99;
        previous.subscribed_rshares = 10;
        previous.balance_rshares = 10;
        let mut ledger = MemberLedger::new([previous]);

        ledger.rebuild(&[sponsorship(1, "alice", 2, "", 10)], &BTreeMap::new());
        let alice = ledger.get(&AccountName::new("alice")).unwrap();
        assert_eq!(alice.shares, 2);
        assert_eq!(alice.balance_rshares, 10);
    }

    #[test]
    fn members_without_shares_are_pruned() {
        let previous = MemberState::new(AccountName::new("gone"));
        let mut ledger = MemberLedger::new([previous]);
        let report = ledger.rebuild(&[sponsorship(1, "alice", 1, "", 10)], &BTreeMap::new());
        assert_eq!(report.pruned, vec![AccountName::new("gone")]);
        assert!(ledger.get(&AccountName::new("gone")).is_none());
    }

    #[test]
    fn delegator_only_member_survives_prune() {
        let mut ledger = MemberLedger::new([]);
        let delegation = DelegationRecord {
            account: AccountName::new("whale"),
            vests: 1_000.0,
            is_leased: false,
            removed: false,
            bonus_shares: 5,
            observed_at: Timestamp::new(10),
        };
        let report = ledger.rebuild_with_delegations(&[], &BTreeMap::new(), &[delegation]);
        assert!(report.pruned.is_empty());
        let whale = ledger.get(&AccountName::new("whale")).unwrap();
        assert_eq!(whale.bonus_shares, 5);
        assert_eq!(whale.total_shares(), 5);
    }

    #[test]
    fn removed_delegation_zeroes_bonus_and_marks_time() {
        let mut ledger = MemberLedger::new([]);
        let removed = DelegationRecord {
            account: AccountName::new("alice"),
            vests: 0.0,
            is_leased: false,
            removed: true,
            bonus_shares: 0,
            observed_at: Timestamp::new(77),
        };
        ledger.rebuild_with_delegations(
            &[sponsorship(1, "alice", 10, "", 10)],
            &BTreeMap::new(),
            &[removed],
        );
        let alice = ledger.get(&AccountName::new("alice")).unwrap();
        assert_eq!(alice.bonus_shares, 0);
        assert_eq!(alice.shares, 10);
        assert_eq!(alice.sp_delegation_timestamp, Some(Timestamp::new(77)));
    }
}
