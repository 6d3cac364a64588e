//! Ledger cycle: replay, delegation bonus, share-age and accrual.

use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_ledger::{
    accrue_all, refresh_share_age, AccrualReport, CycleDecision, CycleGate, MemberLedger,
    RebuildReport,
};
use sbi_store::ServiceStore;
use sbi_types::Timestamp;
use sbi_utils::{format_duration, Clock};

use crate::{RunnerError, Service};

/// Outcome of one completed ledger cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// Recorded as the new `last_cycle`.
    pub cycle_at: Timestamp,
    pub rebuild: RebuildReport,
    pub accrual: AccrualReport,
    pub members: usize,
    /// Members whose quarantine ran out this cycle.
    pub released: u64,
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Run a ledger cycle when one is due. Returns `None` otherwise.
    ///
    /// Delegations are resolved first so that the replay sees fresh lease
    /// transitions. Member rows are rewritten in one batch at the end; a
    /// failure before that leaves the previous cycle's rows in place.
    pub async fn run_ledger_cycle(&self) -> Result<Option<CycleReport>, RunnerError> {
        let now = self.clock.now();
        let state = self.store.get_cycle_state()?;
        let cycle_at = match CycleGate::check(state.last_cycle, self.params.share_cycle_min, now) {
            CycleDecision::Due { cycle_at } => cycle_at,
            CycleDecision::NotDue { elapsed_min } => {
                tracing::debug!(elapsed_min, "ledger cycle not due");
                return Ok(None);
            }
        };

        self.run_delegation_check().await?;

        let events = self.store.all_events()?;
        let delegations = self.store.all_delegations()?;
        let mut ledger = MemberLedger::new(self.store.all_members()?);
        let rebuild = ledger.rebuild_with_delegations(&events, &self.management, &delegations);

        for member in ledger.members_mut() {
            refresh_share_age(member, now);
        }
        let accrual = accrue_all(ledger.members_mut(), &self.params);

        // A quarantine lasts a number of reward cycles, not sweeps.
        let mut released = 0;
        for member in ledger.members_mut() {
            if member.end_quarantine_round() {
                released += 1;
                tracing::info!(member = %member.id, "quarantine over");
            }
        }

        for id in &rebuild.pruned {
            self.store.remove_member(id)?;
            tracing::info!(member = %id, "member pruned, no shares left");
        }
        let members = ledger.into_members();
        self.store.put_members(&members)?;

        // The delegation check advanced its own watermark; reload before
        // writing the cycle time.
        let mut state = self.store.get_cycle_state()?;
        state.last_cycle = Some(cycle_at);
        self.store.put_cycle_state(&state)?;

        tracing::info!(
            members = members.len(),
            applied = rebuild.applied,
            skipped = rebuild.skipped.len(),
            pruned = rebuild.pruned.len(),
            released,
            subscribed_rshares = accrual.subscribed_rshares,
            delegation_rshares = accrual.delegation_rshares,
            behind = %format_duration(cycle_at.elapsed_since(now)),
            "ledger cycle complete"
        );

        Ok(Some(CycleReport {
            cycle_at,
            rebuild,
            accrual,
            members: members.len(),
            released,
        }))
    }
}
