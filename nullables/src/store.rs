//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use sbi_store::{
    ConfigStore, CurationStore, CycleState, DelegationStore, EventStore, MemberStore, PostStore,
    StoreError, TransferLookup, TransferRecord,
};
use sbi_types::{
    AccountName, Authorperm, CurationSample, DelegationRecord, EventStatus, LedgerEvent,
    MemberState, PendingPost, RewardParams, ShareType,
};

/// An in-memory implementation of every storage trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    events: Mutex<BTreeMap<u64, LedgerEvent>>,
    members: Mutex<BTreeMap<AccountName, MemberState>>,
    delegations: Mutex<BTreeMap<AccountName, DelegationRecord>>,
    transfers: Mutex<Vec<TransferRecord>>,
    posts: Mutex<BTreeMap<Authorperm, PendingPost>>,
    curation: Mutex<BTreeMap<(Authorperm, AccountName), CurationSample>>,
    params: Mutex<Option<RewardParams>>,
    cycle: Mutex<CycleState>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `params`.
    pub fn with_params(params: RewardParams) -> Self {
        let store = Self::new();
        *store.params.lock().unwrap() = Some(params);
        store
    }
}

impl EventStore for NullStore {
    fn append_event(&self, event: &LedgerEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap();
        if events.contains_key(&event.event_id) {
            return Err(StoreError::Duplicate(format!("event {}", event.event_id)));
        }
        events.insert(event.event_id, event.clone());
        Ok(())
    }

    fn get_event(&self, event_id: u64) -> Result<LedgerEvent, StoreError> {
        self.events
            .lock()
            .unwrap()
            .get(&event_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    fn all_events(&self) -> Result<Vec<LedgerEvent>, StoreError> {
        Ok(self.events.lock().unwrap().values().cloned().collect())
    }

    fn update_share_type(&self, event_id: u64, share_type: ShareType) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        event.share_type = share_type;
        Ok(())
    }

    fn update_sponsee(
        &self,
        event_id: u64,
        sponsee: &str,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        event.sponsee = sponsee.to_string();
        event.status = status;
        Ok(())
    }
}

impl MemberStore for NullStore {
    fn get_member(&self, id: &AccountName) -> Result<Option<MemberState>, StoreError> {
        Ok(self.members.lock().unwrap().get(id).cloned())
    }

    fn put_member(&self, member: &MemberState) -> Result<(), StoreError> {
        self.members
            .lock()
            .unwrap()
            .insert(member.id.clone(), member.clone());
        Ok(())
    }

    fn remove_member(&self, id: &AccountName) -> Result<(), StoreError> {
        self.members.lock().unwrap().remove(id);
        Ok(())
    }

    fn all_members(&self) -> Result<Vec<MemberState>, StoreError> {
        Ok(self.members.lock().unwrap().values().cloned().collect())
    }
}

impl DelegationStore for NullStore {
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError> {
        self.delegations
            .lock()
            .unwrap()
            .insert(record.account.clone(), record.clone());
        Ok(())
    }

    fn get_delegation(&self, account: &AccountName) -> Result<Option<DelegationRecord>, StoreError> {
        Ok(self.delegations.lock().unwrap().get(account).cloned())
    }

    fn all_delegations(&self) -> Result<Vec<DelegationRecord>, StoreError> {
        Ok(self.delegations.lock().unwrap().values().cloned().collect())
    }
}

impl TransferLookup for NullStore {
    fn put_transfer(&self, record: &TransferRecord) -> Result<(), StoreError> {
        self.transfers.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn transfers_between(
        &self,
        from: &AccountName,
        to: &AccountName,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        Ok(self
            .transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.from == from && &t.to == to)
            .cloned()
            .collect())
    }
}

impl PostStore for NullStore {
    fn put_post(&self, post: &PendingPost) -> Result<(), StoreError> {
        self.posts
            .lock()
            .unwrap()
            .insert(post.authorperm.clone(), post.clone());
        Ok(())
    }

    fn get_post(&self, authorperm: &Authorperm) -> Result<Option<PendingPost>, StoreError> {
        Ok(self.posts.lock().unwrap().get(authorperm).cloned())
    }

    fn all_posts(&self) -> Result<Vec<PendingPost>, StoreError> {
        Ok(self.posts.lock().unwrap().values().cloned().collect())
    }

    fn delete_post(&self, authorperm: &Authorperm) -> Result<(), StoreError> {
        self.posts.lock().unwrap().remove(authorperm);
        Ok(())
    }
}

impl CurationStore for NullStore {
    fn put_curation_sample(&self, sample: &CurationSample) -> Result<(), StoreError> {
        self.curation.lock().unwrap().insert(
            (sample.authorperm.clone(), sample.member.clone()),
            sample.clone(),
        );
        Ok(())
    }

    fn get_curation_sample(
        &self,
        authorperm: &Authorperm,
        member: &AccountName,
    ) -> Result<Option<CurationSample>, StoreError> {
        Ok(self
            .curation
            .lock()
            .unwrap()
            .get(&(authorperm.clone(), member.clone()))
            .cloned())
    }

    fn all_curation_samples(&self) -> Result<Vec<CurationSample>, StoreError> {
        Ok(self.curation.lock().unwrap().values().cloned().collect())
    }
}

impl ConfigStore for NullStore {
    fn get_params(&self) -> Result<Option<RewardParams>, StoreError> {
        Ok(self.params.lock().unwrap().clone())
    }

    fn put_params(&self, params: &RewardParams) -> Result<(), StoreError> {
        *self.params.lock().unwrap() = Some(params.clone());
        Ok(())
    }

    fn get_cycle_state(&self) -> Result<CycleState, StoreError> {
        Ok(self.cycle.lock().unwrap().clone())
    }

    fn put_cycle_state(&self, state: &CycleState) -> Result<(), StoreError> {
        *self.cycle.lock().unwrap() = state.clone();
        Ok(())
    }
}
