//! Abstract storage traits for the reward service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The ledger, scheduler and runner depend only on the traits.

pub mod config;
pub mod curation;
pub mod delegation;
pub mod error;
pub mod event;
pub mod member;
pub mod post;
pub mod transfer;

pub use config::{ConfigStore, CycleState};
pub use curation::CurationStore;
pub use delegation::DelegationStore;
pub use error::StoreError;
pub use event::EventStore;
pub use member::{MemberStore, VoteDelivery};
pub use post::PostStore;
pub use transfer::{TransferLookup, TransferRecord};

/// Everything the service persists, bundled so callers can be generic over
/// a single backend type.
pub trait ServiceStore:
    EventStore + MemberStore + DelegationStore + TransferLookup + PostStore + ConfigStore + CurationStore
{
}

impl<T> ServiceStore for T where
    T: EventStore
        + MemberStore
        + DelegationStore
        + TransferLookup
        + PostStore
        + ConfigStore
        + CurationStore
{
}
