//! Chain-side records as the service sees them.

use serde::{Deserialize, Serialize};

use sbi_crypto::CompactSignature;
use sbi_types::{AccountName, ActiveVote, Authorperm, Timestamp};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainAccount {
    pub name: AccountName,
    pub created: Timestamp,
    pub post_count: u64,
}

/// A post or comment with the fields payout decisions need.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub authorperm: Authorperm,
    pub created: Timestamp,
    /// Empty for root posts.
    pub parent_author: String,
    pub tags: Vec<String>,
    pub app: Option<String>,
    pub body: String,
    /// Pending payout in the chain's fiat-pegged unit.
    pub pending_payout_value: f64,
    pub total_vote_weight: u64,
    pub active_votes: Vec<ActiveVote>,
}

impl Content {
    pub fn is_main_post(&self) -> bool {
        self.parent_author.is_empty()
    }
}

/// The operations the service reacts to. Everything else is `Other`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChainOp {
    Comment {
        author: AccountName,
        permlink: String,
        parent_author: String,
        body: String,
        json_metadata: String,
    },
    Vote {
        voter: AccountName,
        author: AccountName,
        permlink: String,
        weight: i64,
    },
    Transfer {
        from: AccountName,
        to: AccountName,
        amount: f64,
        symbol: String,
        memo: String,
    },
    Other(String),
}

impl ChainOp {
    pub fn kind(&self) -> &str {
        match self {
            ChainOp::Comment { .. } => "comment",
            ChainOp::Vote { .. } => "vote",
            ChainOp::Transfer { .. } => "transfer",
            ChainOp::Other(kind) => kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignedTransaction {
    pub trx_id: String,
    pub operations: Vec<ChainOp>,
    pub signatures: Vec<CompactSignature>,
    /// The transaction exactly as the node returned it, needed to ask the
    /// node for its binary serialization.
    pub raw: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub block_num: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<SignedTransaction>,
}

/// One operation with its position on chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockOp {
    pub block_num: u64,
    pub trx_id: String,
    pub timestamp: Timestamp,
    pub op: ChainOp,
}

impl Block {
    /// Flatten into positioned operations, keeping only `kinds` (all when empty).
    pub fn ops(&self, kinds: &[&str]) -> Vec<BlockOp> {
        self.transactions
            .iter()
            .flat_map(|tx| {
                tx.operations.iter().map(move |op| BlockOp {
                    block_num: self.block_num,
                    trx_id: tx.trx_id.clone(),
                    timestamp: self.timestamp,
                    op: op.clone(),
                })
            })
            .filter(|o| kinds.is_empty() || kinds.contains(&o.op.kind()))
            .collect()
    }
}
