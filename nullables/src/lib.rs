//! In-memory stand-ins for the chain, store and clock.
//!
//! Jobs only see the `ChainClient`, `VoteBroadcaster`, store and `Clock`
//! traits, so tests build a scenario by seeding a [`NullChain`] with blocks,
//! accounts and content, a [`NullStore`] with members and posts, and a
//! [`NullClock`] at a fixed time. Broadcast votes are recorded on the chain
//! double for assertions.

pub mod chain;
pub mod clock;
pub mod store;

pub use chain::{NullChain, RecordedVote};
pub use clock::NullClock;
pub use store::NullStore;
