//! Delegated stake → bonus shares.

use std::collections::BTreeMap;

use sbi_store::{EventStore, StoreError, TransferLookup};
use sbi_types::{AccountName, DelegationRecord, LedgerEvent, ShareType, Timestamp};

use crate::LedgerError;

/// A delegation found to be paid for. The event is rewritten from
/// `Delegation` to `DelegationLeased`.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaseTransition {
    pub event_id: u64,
    pub account: AccountName,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DelegationResolution {
    /// Latest delegation state per delegator.
    pub records: BTreeMap<AccountName, DelegationRecord>,
    pub transitions: Vec<LeaseTransition>,
    /// Newest delegation timestamp examined; the next check starts here.
    pub watermark: Option<Timestamp>,
}

impl DelegationResolution {
    pub fn bonus_shares(&self) -> BTreeMap<AccountName, i64> {
        self.records
            .iter()
            .map(|(a, r)| (a.clone(), r.bonus_shares))
            .collect()
    }

    pub fn records(&self) -> Vec<DelegationRecord> {
        self.records.values().cloned().collect()
    }

    /// Write lease transitions back to the event log.
    pub fn persist_transitions<S: EventStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        for t in &self.transitions {
            store.update_share_type(t.event_id, ShareType::DelegationLeased)?;
            tracing::info!(account = %t.account, event_id = t.event_id, "delegation marked as leased");
        }
        Ok(())
    }
}

/// Converts the latest delegation per account into bonus shares.
pub struct DelegationResolver {
    service_account: AccountName,
    sp_share_ratio: f64,
}

impl DelegationResolver {
    pub fn new(service_account: AccountName, sp_share_ratio: f64) -> Result<Self, LedgerError> {
        if !(sp_share_ratio.is_finite() && sp_share_ratio > 0.0) {
            return Err(LedgerError::InvalidParams(format!(
                "sp_share_ratio must be positive, got {sp_share_ratio}"
            )));
        }
        Ok(Self {
            service_account,
            sp_share_ratio,
        })
    }

    /// Resolve delegation-family events.
    ///
    /// The latest event per account wins, by stream position. Delegations
    /// newer than `watermark` are checked against `transfers` for a payment
    /// from the service account to the delegator; older ones were checked
    /// on a previous run and would already carry `DelegationLeased`.
    /// `vests_to_native` converts raw vests into stake units.
    pub fn resolve<T, F>(
        &self,
        events: &[LedgerEvent],
        transfers: &T,
        vests_to_native: F,
        watermark: Option<Timestamp>,
    ) -> Result<DelegationResolution, LedgerError>
    where
        T: TransferLookup + ?Sized,
        F: Fn(f64) -> f64,
    {
        let mut latest: BTreeMap<&AccountName, &LedgerEvent> = BTreeMap::new();
        for event in events.iter().filter(|e| e.share_type.is_delegation()) {
            match latest.get(&event.account) {
                Some(prev) if prev.event_id > event.event_id => {}
                _ => {
                    latest.insert(&event.account, event);
                }
            }
        }

        let mut resolution = DelegationResolution {
            watermark,
            ..Default::default()
        };

        for (account, event) in latest {
            let mut record = DelegationRecord {
                account: account.clone(),
                vests: event.vests,
                is_leased: false,
                removed: false,
                bonus_shares: 0,
                observed_at: event.timestamp,
            };

            match event.share_type {
                ShareType::RemovedDelegation => record.removed = true,
                ShareType::DelegationLeased => record.is_leased = true,
                _ => {
                    let fresh = watermark.map_or(true, |w| event.timestamp > w);
                    if fresh {
                        resolution.watermark = resolution.watermark.max(Some(event.timestamp));
                        let paid = transfers.transfers_between(&self.service_account, account)?;
                        if !paid.is_empty() {
                            record.is_leased = true;
                            resolution.transitions.push(LeaseTransition {
                                event_id: event.event_id,
                                account: account.clone(),
                            });
                        }
                    }
                    if !record.is_leased {
                        record.bonus_shares = self.bonus_for(vests_to_native(event.vests));
                    }
                }
            }

            resolution.records.insert(account.clone(), record);
        }

        Ok(resolution)
    }

    fn bonus_for(&self, native: f64) -> i64 {
        let bonus = (native / self.sp_share_ratio).floor();
        if bonus.is_finite() && bonus > 0.0 {
            bonus as i64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_nullables::NullStore;
    use sbi_store::TransferRecord;
    use sbi_types::EventStatus;

    fn delegation(id: u64, account: &str, share_type: ShareType, vests: f64, ts: u64) -> LedgerEvent {
        LedgerEvent {
            event_id: id,
            share_type,
            status: EventStatus::Valid,
            account: AccountName::new(account),
            sponsor: AccountName::new(account),
            sponsee: String::new(),
            shares: 0,
            vests,
            memo: String::new(),
            timestamp: Timestamp::new(ts),
        }
    }

    fn resolver() -> DelegationResolver {
        DelegationResolver::new(AccountName::new("service"), 2.0).unwrap()
    }

    fn identity(v: f64) -> f64 {
        v
    }

    #[test]
    fn rejects_non_positive_ratio() {
        assert!(DelegationResolver::new(AccountName::new("service"), 0.0).is_err());
    }

    #[test]
    fn converts_vests_to_floored_bonus() {
        let store = NullStore::new();
        let events = [delegation(1, "alice", ShareType::Delegation, 1001.0, 10)];
        let res = resolver().resolve(&events, &store, identity, None).unwrap();
        assert_eq!(res.bonus_shares()[&AccountName::new("alice")], 500);
        assert_eq!(res.watermark, Some(Timestamp::new(10)));
    }

    #[test]
    fn latest_event_by_stream_position_wins() {
        let store = NullStore::new();
        // The removal has the earlier timestamp but the later event id.
        let events = [
            delegation(1, "m", ShareType::Delegation, 1000.0, 500),
            delegation(2, "m", ShareType::RemovedDelegation, 0.0, 100),
        ];
        let res = resolver().resolve(&events, &store, identity, None).unwrap();
        let record = &res.records[&AccountName::new("m")];
        assert!(record.removed);
        assert_eq!(record.bonus_shares, 0);
    }

    #[test]
    fn paid_delegation_is_leased_and_recorded() {
        let store = NullStore::new();
        store
            .put_transfer(&TransferRecord {
                trx_id: "t".into(),
                from: AccountName::new("service"),
                to: AccountName::new("alice"),
                amount: 1.0,
                symbol: "HBD".into(),
                memo: String::new(),
                timestamp: Timestamp::new(20),
            })
            .unwrap();
        let event = delegation(4, "alice", ShareType::Delegation, 1000.0, 10);
        store.append_event(&event).unwrap();

        let res = resolver().resolve(&[event], &store, identity, None).unwrap();
        assert_eq!(res.bonus_shares()[&AccountName::new("alice")], 0);
        assert_eq!(
            res.transitions,
            vec![LeaseTransition {
                event_id: 4,
                account: AccountName::new("alice")
            }]
        );

        res.persist_transitions(&store).unwrap();
        assert_eq!(store.get_event(4).unwrap().share_type, ShareType::DelegationLeased);
    }

    #[test]
    fn delegations_behind_watermark_skip_lookup() {
        let store = NullStore::new();
        store
            .put_transfer(&TransferRecord {
                trx_id: "t".into(),
                from: AccountName::new("service"),
                to: AccountName::new("alice"),
                amount: 1.0,
                symbol: "HBD".into(),
                memo: String::new(),
                timestamp: Timestamp::new(20),
            })
            .unwrap();
        let events = [delegation(1, "alice", ShareType::Delegation, 1000.0, 10)];
        let res = resolver()
            .resolve(&events, &store, identity, Some(Timestamp::new(10)))
            .unwrap();
        assert!(res.transitions.is_empty());
        assert_eq!(res.bonus_shares()[&AccountName::new("alice")], 500);
        assert_eq!(res.watermark, Some(Timestamp::new(10)));
    }

    #[test]
    fn already_leased_event_contributes_nothing() {
        let store = NullStore::new();
        let events = [delegation(1, "alice", ShareType::DelegationLeased, 1000.0, 10)];
        let res = resolver().resolve(&events, &store, identity, None).unwrap();
        assert!(res.records[&AccountName::new("alice")].is_leased);
        assert_eq!(res.bonus_shares()[&AccountName::new("alice")], 0);
    }
}
