//! Maintenance jobs. None of these run in the job loop; the daemon invokes
//! them on request.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_ledger::calc_share_age_until;
use sbi_store::ServiceStore;
use sbi_types::{AccountName, EventStatus, LedgerEvent, MemberState, ShareType, Timestamp};
use sbi_utils::Clock;

use crate::{RunnerError, Service};

/// An enrollment without named sponsees, given to the longest-standing
/// member.
#[derive(Clone, Debug, PartialEq)]
pub struct SponseeAssignment {
    pub event_id: u64,
    pub sponsee: AccountName,
    pub shares: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub account: AccountName,
    pub reason: String,
}

/// An externally maintained blacklist, as TOML:
///
/// ```toml
/// [[entries]]
/// account = "spammer"
/// reason = "plagiarism"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlacklistFile {
    #[serde(default)]
    pub entries: Vec<BlacklistEntry>,
}

impl BlacklistFile {
    pub fn from_toml_str(s: &str) -> Result<Self, RunnerError> {
        toml::from_str(s).map_err(|e| RunnerError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &str) -> Result<Self, RunnerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RunnerError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberCheck {
    pub members: usize,
    pub total_shares: i64,
    pub total_bonus_shares: i64,
    pub total_balance_rshares: i64,
    pub total_rewarded_rshares: i64,
    /// Valid enrollments whose sponsor has no member row.
    pub orphaned_events: Vec<u64>,
    pub invariant_violations: Vec<(AccountName, String)>,
}

/// Average share-age of `member` as it stood at `at`.
fn avg_share_age_at(member: &MemberState, at: Timestamp) -> f64 {
    let total = member.total_shares();
    if total <= 0 {
        return 0.0;
    }
    calc_share_age_until(member, at) / total as f64
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Give the shares of `LessOrNoSponsee` enrollments that name nobody
    /// to the member with the highest average share-age at the time of the
    /// enrollment, and mark the event valid. The next ledger cycle picks
    /// the change up.
    pub fn reassign_sponsees(&self) -> Result<Vec<SponseeAssignment>, RunnerError> {
        let members = self.store.all_members()?;
        let mut assigned = Vec::new();

        for event in self.store.events_by_status(EventStatus::LessOrNoSponsee)? {
            match event.sponsee_map() {
                Ok(named) if named.is_empty() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(event_id = event.event_id, error = %e, "unreadable sponsee list");
                    continue;
                }
            }

            let mut best: Option<(&MemberState, f64)> = None;
            for member in &members {
                let avg = avg_share_age_at(member, event.timestamp);
                if avg > best.map_or(0.0, |(_, b)| b) {
                    best = Some((member, avg));
                }
            }
            let Some((winner, avg)) = best else {
                tracing::warn!(event_id = event.event_id, "no member with share-age to assign to");
                continue;
            };

            let sponsee = BTreeMap::from([(winner.id.clone(), event.shares)]);
            self.store.update_sponsee(
                event.event_id,
                &LedgerEvent::encode_sponsee(&sponsee),
                EventStatus::Valid,
            )?;
            tracing::info!(
                event_id = event.event_id,
                sponsee = %winner.id,
                shares = event.shares,
                avg_share_age = avg,
                "sponsee assigned"
            );
            assigned.push(SponseeAssignment {
                event_id: event.event_id,
                sponsee: winner.id.clone(),
                shares: event.shares,
            });
        }
        Ok(assigned)
    }

    /// Apply an external blacklist. Listed members are blacklisted with the
    /// given reason. Members that were blacklisted externally and are no
    /// longer listed are cleared. Running detector quarantines are left to
    /// run out. Returns how many rows changed.
    pub fn sync_blacklist(&self, entries: &[BlacklistEntry]) -> Result<usize, RunnerError> {
        let listed: BTreeMap<&AccountName, &str> = entries
            .iter()
            .map(|e| (&e.account, e.reason.as_str()))
            .collect();
        let mut changed = 0;

        for mut member in self.store.all_members()? {
            let before = (member.blacklisted, member.quarantine_reason.clone());
            match listed.get(&member.id) {
                Some(reason) => {
                    member.blacklisted = true;
                    member.quarantine_reason = Some((*reason).to_string());
                }
                None if member.blacklisted && member.skip_rounds == 0 => {
                    member.blacklisted = false;
                    member.quarantine_reason = None;
                }
                None => {}
            }
            if (member.blacklisted, member.quarantine_reason.clone()) != before {
                tracing::info!(
                    member = %member.id,
                    blacklisted = member.blacklisted,
                    "blacklist status changed"
                );
                self.store.put_member(&member)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Consistency report over member rows and the event log.
    pub fn check_members(&self) -> Result<MemberCheck, RunnerError> {
        let members = self.store.all_members()?;
        let ids: BTreeSet<&AccountName> = members.iter().map(|m| &m.id).collect();
        let mut check = MemberCheck {
            members: members.len(),
            ..Default::default()
        };

        for member in &members {
            check.total_shares += member.shares;
            check.total_bonus_shares += member.bonus_shares;
            check.total_balance_rshares += member.balance_rshares;
            check.total_rewarded_rshares += member.rewarded_rshares;
            if let Some(violation) = member.invariant_violation() {
                check.invariant_violations.push((member.id.clone(), violation));
            }
        }

        for event in self.store.events_by_share_type(&[ShareType::Sponsorship])? {
            if event.status == EventStatus::Valid
                && event.shares > 0
                && !ids.contains(&event.sponsor)
            {
                check.orphaned_events.push(event.event_id);
            }
        }

        tracing::info!(
            members = check.members,
            shares = check.total_shares,
            bonus_shares = check.total_bonus_shares,
            balance_rshares = check.total_balance_rshares,
            rewarded_rshares = check.total_rewarded_rshares,
            orphaned = check.orphaned_events.len(),
            violations = check.invariant_violations.len(),
            "member check"
        );
        for (id, violation) in &check.invariant_violations {
            tracing::warn!(member = %id, violation = %violation, "member record invariant violated");
        }
        Ok(check)
    }
}
