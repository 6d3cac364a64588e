//! Voter pool / mana model.

use std::collections::BTreeSet;

use sbi_chain::{ChainClient, ChainError};
use sbi_types::{AccountName, VoterCapacity};

use crate::VotingError;

/// The service's voter accounts, in configured order.
///
/// Capacity is never cached: mana is drained by every vote in the same
/// pass, so each decision re-reads it from the chain. Only one scheduler
/// may drive a given pool at a time.
#[derive(Clone, Debug)]
pub struct VoterPool {
    voters: Vec<AccountName>,
}

impl VoterPool {
    pub fn new(voters: Vec<AccountName>) -> Result<Self, VotingError> {
        if voters.is_empty() {
            return Err(VotingError::EmptyPool);
        }
        Ok(Self { voters })
    }

    pub fn voters(&self) -> &[AccountName] {
        &self.voters
    }

    pub fn contains(&self, account: &AccountName) -> bool {
        self.voters.contains(account)
    }

    /// Current capacity of one voter, read from the chain.
    pub async fn capacity<C: ChainClient + ?Sized>(
        &self,
        chain: &C,
        account: &AccountName,
    ) -> Result<VoterCapacity, ChainError> {
        chain.get_capacity(account).await
    }

    /// Fresh capacities of every voter not in `used`, in configured order.
    /// A voter whose account cannot be read is left out for this decision.
    pub async fn refresh<C: ChainClient + ?Sized>(
        &self,
        chain: &C,
        used: &BTreeSet<AccountName>,
    ) -> Vec<VoterCapacity> {
        let mut out = Vec::with_capacity(self.voters.len());
        for voter in self.voters.iter().filter(|v| !used.contains(*v)) {
            match self.capacity(chain, voter).await {
                Ok(cap) => out.push(cap),
                Err(e) => tracing::warn!(voter = %voter, error = %e, "could not read voter capacity"),
            }
        }
        out
    }
}
