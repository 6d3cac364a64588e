//! Configuration singleton and cycle bookkeeping.

use crate::StoreError;
use sbi_types::{RewardParams, Timestamp};
use serde::{Deserialize, Serialize};

/// Progress markers persisted between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    pub last_cycle: Option<Timestamp>,
    pub last_delegation_check: Option<Timestamp>,
    pub last_streamed_block: Option<u64>,
    pub last_scanned_vote_block: Option<u64>,
}

pub trait ConfigStore {
    fn get_params(&self) -> Result<Option<RewardParams>, StoreError>;
    fn put_params(&self, params: &RewardParams) -> Result<(), StoreError>;
    fn get_cycle_state(&self) -> Result<CycleState, StoreError>;
    fn put_cycle_state(&self, state: &CycleState) -> Result<(), StoreError>;
}
