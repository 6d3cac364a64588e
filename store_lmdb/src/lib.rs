//! LMDB storage backend for the reward service.
//!
//! Implements all storage traits from `sbi-store` using the `heed` LMDB bindings.
//! Each logical store maps to one named database within a single environment,
//! and every row is a bincode-encoded value.

pub mod config;
pub mod curation;
pub mod delegation;
pub mod environment;
pub mod error;
pub mod event;
pub mod member;
pub mod post;
pub mod transfer;

pub use environment::LmdbStore;
pub use error::LmdbError;
