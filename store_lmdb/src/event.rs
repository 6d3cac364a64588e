//! LMDB implementation of EventStore.
//!
//! Keys are big-endian event ids so that key order is stream order.

use sbi_store::{EventStore, StoreError};
use sbi_types::{EventStatus, LedgerEvent, ShareType};

use crate::{LmdbError, LmdbStore};

fn event_key(event_id: u64) -> [u8; 8] {
    event_id.to_be_bytes()
}

impl LmdbStore {
    fn load_event(&self, event_id: u64) -> Result<LedgerEvent, LmdbError> {
        self.get_row(self.events_db, &event_key(event_id))?
            .ok_or_else(|| LmdbError::NotFound(format!("event {event_id}")))
    }
}

impl EventStore for LmdbStore {
    fn append_event(&self, event: &LedgerEvent) -> Result<(), StoreError> {
        let key = event_key(event.event_id);
        let existing: Option<LedgerEvent> = self.get_row(self.events_db, &key)?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(format!("event {}", event.event_id)));
        }
        self.put_row(self.events_db, &key, event)?;
        Ok(())
    }

    fn get_event(&self, event_id: u64) -> Result<LedgerEvent, StoreError> {
        Ok(self.load_event(event_id)?)
    }

    fn all_events(&self) -> Result<Vec<LedgerEvent>, StoreError> {
        Ok(self.scan(self.events_db)?)
    }

    fn update_share_type(&self, event_id: u64, share_type: ShareType) -> Result<(), StoreError> {
        let mut event = self.load_event(event_id)?;
        event.share_type = share_type;
        self.put_row(self.events_db, &event_key(event_id), &event)?;
        Ok(())
    }

    fn update_sponsee(
        &self,
        event_id: u64,
        sponsee: &str,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        let mut event = self.load_event(event_id)?;
        event.sponsee = sponsee.to_string();
        event.status = status;
        self.put_row(self.events_db, &event_key(event_id), &event)?;
        Ok(())
    }
}
