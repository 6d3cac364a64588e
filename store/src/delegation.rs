use crate::StoreError;
use sbi_types::{AccountName, DelegationRecord};

pub trait DelegationStore {
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError>;
    fn get_delegation(&self, account: &AccountName) -> Result<Option<DelegationRecord>, StoreError>;
    fn all_delegations(&self) -> Result<Vec<DelegationRecord>, StoreError>;
}
