use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_ledger::DelegationResolver;
use sbi_store::ServiceStore;
use sbi_types::Timestamp;
use sbi_utils::Clock;

use crate::{RunnerError, Service};

#[derive(Clone, Debug, PartialEq)]
pub struct DelegationReport {
    pub records: usize,
    pub newly_leased: usize,
    pub watermark: Option<Timestamp>,
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Resolve delegations into bonus-share records and persist lease
    /// transitions. Only delegations newer than the stored watermark are
    /// checked against service payments.
    pub async fn run_delegation_check(&self) -> Result<DelegationReport, RunnerError> {
        let mut state = self.store.get_cycle_state()?;
        let events = self.store.all_events()?;

        // Vests convert linearly at the current global rate.
        let native_per_vest = self.chain.vests_to_native(1.0).await?;
        let resolver =
            DelegationResolver::new(self.config.service_account.clone(), self.params.sp_share_ratio)?;
        let resolution = resolver.resolve(
            &events,
            self.store.as_ref(),
            |vests| vests * native_per_vest,
            state.last_delegation_check,
        )?;

        resolution.persist_transitions(self.store.as_ref())?;
        let records = resolution.records();
        for record in &records {
            self.store.put_delegation(record)?;
        }

        state.last_delegation_check = resolution.watermark;
        self.store.put_cycle_state(&state)?;

        tracing::info!(
            delegations = records.len(),
            leased = resolution.transitions.len(),
            "delegation check complete"
        );
        Ok(DelegationReport {
            records: records.len(),
            newly_leased: resolution.transitions.len(),
            watermark: resolution.watermark,
        })
    }
}
