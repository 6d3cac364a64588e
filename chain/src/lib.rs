//! Chain access for the reward service.
//!
//! Everything that talks to the network goes through [`ChainClient`] (reads)
//! or [`VoteBroadcaster`] (writes). The production implementations speak
//! JSON-RPC to a rotating list of public nodes and hand vote signing to an
//! external signer service.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod mana;
pub mod parse;
pub mod retry;
pub mod rpc;
pub mod types;

pub use broadcast::{DryRunBroadcaster, SignerServiceBroadcaster};
pub use client::{ChainClient, VoteBroadcaster};
pub use error::ChainError;
pub use mana::{Manabar, MANA_REGENERATION_SECS};
pub use retry::RetryPolicy;
pub use rpc::RpcChainClient;
pub use types::{Block, BlockOp, ChainAccount, ChainOp, Content, SignedTransaction};
