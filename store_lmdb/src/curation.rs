//! LMDB implementation of CurationStore.

use sbi_store::{CurationStore, StoreError};
use sbi_types::{AccountName, Authorperm, CurationSample};

use crate::LmdbStore;

fn sample_key(authorperm: &Authorperm, member: &AccountName) -> Vec<u8> {
    format!("{authorperm}\0{member}").into_bytes()
}

impl CurationStore for LmdbStore {
    fn put_curation_sample(&self, sample: &CurationSample) -> Result<(), StoreError> {
        self.put_row(
            self.curation_db,
            &sample_key(&sample.authorperm, &sample.member),
            sample,
        )?;
        Ok(())
    }

    fn get_curation_sample(
        &self,
        authorperm: &Authorperm,
        member: &AccountName,
    ) -> Result<Option<CurationSample>, StoreError> {
        Ok(self.get_row(self.curation_db, &sample_key(authorperm, member))?)
    }

    fn all_curation_samples(&self) -> Result<Vec<CurationSample>, StoreError> {
        Ok(self.scan(self.curation_db)?)
    }
}
