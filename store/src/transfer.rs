//! Transfer history lookup, used to detect leased delegations.

use crate::StoreError;
use sbi_types::{AccountName, Timestamp};
use serde::{Deserialize, Serialize};

/// One observed transfer between two accounts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub trx_id: String,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: f64,
    pub symbol: String,
    pub memo: String,
    pub timestamp: Timestamp,
}

pub trait TransferLookup {
    fn put_transfer(&self, record: &TransferRecord) -> Result<(), StoreError>;

    /// All transfers sent from `from` to `to`.
    fn transfers_between(
        &self,
        from: &AccountName,
        to: &AccountName,
    ) -> Result<Vec<TransferRecord>, StoreError>;
}
