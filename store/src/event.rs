//! Ledger event storage trait.

use crate::StoreError;
use sbi_types::{EventStatus, LedgerEvent, ShareType};

/// Append-only event log. Rows are returned in `event_id` order.
pub trait EventStore {
    fn append_event(&self, event: &LedgerEvent) -> Result<(), StoreError>;
    fn get_event(&self, event_id: u64) -> Result<LedgerEvent, StoreError>;
    fn all_events(&self) -> Result<Vec<LedgerEvent>, StoreError>;

    /// Record a share-type transition (e.g. `Delegation` → `DelegationLeased`).
    fn update_share_type(&self, event_id: u64, share_type: ShareType) -> Result<(), StoreError>;

    /// Rewrite the sponsee payload and status after maintenance reprocessing.
    fn update_sponsee(
        &self,
        event_id: u64,
        sponsee: &str,
        status: EventStatus,
    ) -> Result<(), StoreError>;

    /// Events whose share type is one of `types`, in stream order.
    fn events_by_share_type(&self, types: &[ShareType]) -> Result<Vec<LedgerEvent>, StoreError> {
        Ok(self
            .all_events()?
            .into_iter()
            .filter(|e| types.contains(&e.share_type))
            .collect())
    }

    fn events_by_status(&self, status: EventStatus) -> Result<Vec<LedgerEvent>, StoreError> {
        Ok(self
            .all_events()?
            .into_iter()
            .filter(|e| e.status == status)
            .collect())
    }

    fn next_event_id(&self) -> Result<u64, StoreError> {
        Ok(self
            .all_events()?
            .last()
            .map(|e| e.event_id + 1)
            .unwrap_or(0))
    }
}
