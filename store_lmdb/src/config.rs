//! LMDB implementation of ConfigStore, kept in the `meta` database.

use sbi_store::{ConfigStore, CycleState, StoreError};
use sbi_types::RewardParams;

use crate::LmdbStore;

const PARAMS_KEY: &[u8] = b"params";
const CYCLE_STATE_KEY: &[u8] = b"cycle_state";

impl ConfigStore for LmdbStore {
    fn get_params(&self) -> Result<Option<RewardParams>, StoreError> {
        Ok(self.get_row(self.meta_db, PARAMS_KEY)?)
    }

    fn put_params(&self, params: &RewardParams) -> Result<(), StoreError> {
        self.put_row(self.meta_db, PARAMS_KEY, params)?;
        Ok(())
    }

    fn get_cycle_state(&self) -> Result<CycleState, StoreError> {
        Ok(self
            .get_row(self.meta_db, CYCLE_STATE_KEY)?
            .unwrap_or_default())
    }

    fn put_cycle_state(&self, state: &CycleState) -> Result<(), StoreError> {
        self.put_row(self.meta_db, CYCLE_STATE_KEY, state)?;
        Ok(())
    }
}
