//! LMDB implementation of TransferLookup.
//!
//! Keys are `from \0 to \0 trx_id`, so a prefix scan on `from \0 to \0`
//! yields every transfer between the pair.

use sbi_store::{StoreError, TransferLookup, TransferRecord};
use sbi_types::AccountName;

use crate::LmdbStore;

fn pair_prefix(from: &AccountName, to: &AccountName) -> Vec<u8> {
    let mut key = Vec::with_capacity(from.as_str().len() + to.as_str().len() + 2);
    key.extend_from_slice(from.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(to.as_str().as_bytes());
    key.push(0);
    key
}

impl TransferLookup for LmdbStore {
    fn put_transfer(&self, record: &TransferRecord) -> Result<(), StoreError> {
        let mut key = pair_prefix(&record.from, &record.to);
        key.extend_from_slice(record.trx_id.as_bytes());
        self.put_row(self.transfers_db, &key, record)?;
        Ok(())
    }

    fn transfers_between(
        &self,
        from: &AccountName,
        to: &AccountName,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        Ok(self.scan_prefix(self.transfers_db, &pair_prefix(from, to))?)
    }
}
