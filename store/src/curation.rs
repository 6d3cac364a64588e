use crate::StoreError;
use sbi_types::{AccountName, Authorperm, CurationSample};

/// Per-vote curation performance samples, feeding delay calibration.
pub trait CurationStore {
    fn put_curation_sample(&self, sample: &CurationSample) -> Result<(), StoreError>;
    fn get_curation_sample(
        &self,
        authorperm: &Authorperm,
        member: &AccountName,
    ) -> Result<Option<CurationSample>, StoreError>;
    fn all_curation_samples(&self) -> Result<Vec<CurationSample>, StoreError>;
}
