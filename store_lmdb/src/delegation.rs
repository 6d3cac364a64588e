//! LMDB implementation of DelegationStore.

use sbi_store::{DelegationStore, StoreError};
use sbi_types::{AccountName, DelegationRecord};

use crate::LmdbStore;

impl DelegationStore for LmdbStore {
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError> {
        self.put_row(self.delegations_db, record.account.as_str().as_bytes(), record)?;
        Ok(())
    }

    fn get_delegation(&self, account: &AccountName) -> Result<Option<DelegationRecord>, StoreError> {
        Ok(self.get_row(self.delegations_db, account.as_str().as_bytes())?)
    }

    fn all_delegations(&self) -> Result<Vec<DelegationRecord>, StoreError> {
        Ok(self.scan(self.delegations_db)?)
    }
}
