//! Chain access traits.

use async_trait::async_trait;

use sbi_types::{AccountName, ActiveVote, Authorperm, Timestamp, VoterCapacity};

use crate::types::{Block, BlockOp, ChainAccount, Content, SignedTransaction};
use crate::ChainError;

/// Seconds between blocks.
pub const BLOCK_INTERVAL_SECS: u64 = 3;

/// Read access to the chain.
///
/// Implementations are expected to retry transient failures internally.
/// [`ChainClient::rotate_node`] lets callers that run their own retry loop
/// (vote delivery) move to another backend between attempts.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Hex chain id, used to domain-separate transaction digests.
    fn chain_id(&self) -> &str;

    /// Prefix of public keys in text form.
    fn key_prefix(&self) -> &str {
        sbi_crypto::DEFAULT_KEY_PREFIX
    }

    /// Switch to the next backend node.
    fn rotate_node(&self);

    async fn head_block(&self) -> Result<(u64, Timestamp), ChainError>;

    async fn get_account(&self, id: &AccountName) -> Result<Option<ChainAccount>, ChainError>;

    /// Fresh voting capacity. Never cached: every call reads the chain.
    async fn get_capacity(&self, account: &AccountName) -> Result<VoterCapacity, ChainError>;

    async fn get_content(&self, authorperm: &Authorperm) -> Result<Content, ChainError>;

    async fn get_votes(&self, authorperm: &Authorperm) -> Result<Vec<ActiveVote>, ChainError>;

    async fn get_block(&self, block_num: u64) -> Result<Option<Block>, ChainError>;

    /// Binary serialization of a signed transaction, as the node encodes it.
    async fn transaction_bytes(&self, tx: &SignedTransaction) -> Result<Vec<u8>, ChainError>;

    /// Accounts whose authorities reference any of `keys` (text form).
    async fn accounts_for_keys(&self, keys: &[String]) -> Result<Vec<AccountName>, ChainError>;

    async fn vests_to_native(&self, vests: f64) -> Result<f64, ChainError>;

    async fn rshares_to_fiat(&self, rshares: f64) -> Result<f64, ChainError>;

    async fn head_block_num(&self) -> Result<u64, ChainError> {
        Ok(self.head_block().await?.0)
    }

    /// Approximate the block produced at `at` from the head block time.
    async fn estimate_block_num(&self, at: Timestamp) -> Result<u64, ChainError> {
        let (head, head_time) = self.head_block().await?;
        let behind = at.elapsed_since(head_time) / BLOCK_INTERVAL_SECS;
        Ok(head.saturating_sub(behind))
    }

    /// Operations of the given kinds in `[start, stop]` (all kinds when
    /// empty). Missing blocks are skipped.
    async fn stream_ops(
        &self,
        start: u64,
        stop: u64,
        kinds: &[&str],
    ) -> Result<Vec<BlockOp>, ChainError> {
        let mut ops = Vec::new();
        for num in start..=stop {
            if let Some(block) = self.get_block(num).await? {
                ops.extend(block.ops(kinds));
            }
        }
        Ok(ops)
    }
}

/// Submits votes. Key custody lives behind this trait.
#[async_trait]
pub trait VoteBroadcaster: Send + Sync {
    /// `percentage` is in `(0, 100]`.
    async fn broadcast_vote(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> Result<(), ChainError>;
}

