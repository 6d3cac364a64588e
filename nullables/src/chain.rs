//! Nullable chain: an in-memory network that records votes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use sbi_chain::types::{Block, ChainAccount, Content, SignedTransaction};
use sbi_chain::{ChainClient, ChainError, VoteBroadcaster};
use sbi_types::vote::MANA_PER_FULL_VOTE_DIVISOR;
use sbi_types::{AccountName, ActiveVote, Authorperm, Timestamp, VoterCapacity};

/// Chain id used by default. Same as the live network.
pub const NULL_CHAIN_ID: &str = "beeab0de00000000000000000000000000000000000000000000000000000000";

/// A vote the chain accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedVote {
    pub voter: AccountName,
    pub authorperm: Authorperm,
    pub percentage: f64,
    pub rshares: i64,
}

#[derive(Default)]
struct State {
    head: u64,
    head_time: Timestamp,
    accounts: BTreeMap<AccountName, ChainAccount>,
    capacities: BTreeMap<AccountName, VoterCapacity>,
    contents: BTreeMap<Authorperm, Content>,
    blocks: BTreeMap<u64, Block>,
    tx_bytes: HashMap<String, Vec<u8>>,
    key_refs: BTreeMap<String, Vec<AccountName>>,
    native_per_vest: f64,
    fiat_per_rshare: f64,
    failing_broadcasts: u32,
    failing_reads: u32,
    failing_content: BTreeMap<Authorperm, u32>,
    swallow_votes: bool,
    recorded: Vec<RecordedVote>,
    broadcast_attempts: u32,
    rotations: u32,
}

/// A programmable chain for tests.
///
/// Broadcasting a vote adds it to the post's active votes with
/// `rshares = capacity × percentage / 100` and drains the voter's mana the
/// way a real vote would, so successive votes in one pass see less capacity.
pub struct NullChain {
    state: Mutex<State>,
    chain_id: String,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                native_per_vest: 1.0,
                fiat_per_rshare: 1e-9,
                ..State::default()
            }),
            chain_id: NULL_CHAIN_ID.to_string(),
        }
    }

    pub fn set_head(&self, block: u64, time: Timestamp) {
        let mut s = self.state.lock().unwrap();
        s.head = block;
        s.head_time = time;
    }

    pub fn add_account(&self, name: &str, created: Timestamp) {
        self.state.lock().unwrap().accounts.insert(
            AccountName::new(name),
            ChainAccount {
                name: AccountName::new(name),
                created,
                post_count: 0,
            },
        );
    }

    pub fn set_capacity(&self, account: &str, max_mana: f64, current_mana_pct: f64) {
        self.state.lock().unwrap().capacities.insert(
            AccountName::new(account),
            VoterCapacity {
                account: AccountName::new(account),
                max_mana,
                current_mana_pct,
            },
        );
    }

    pub fn add_content(&self, content: Content) {
        self.state
            .lock()
            .unwrap()
            .contents
            .insert(content.authorperm.clone(), content);
    }

    /// Add a vote directly to a post, bypassing broadcasting.
    pub fn add_vote(&self, authorperm: &Authorperm, vote: ActiveVote) {
        if let Some(content) = self.state.lock().unwrap().contents.get_mut(authorperm) {
            content.total_vote_weight += vote.weight;
            content.active_votes.push(vote);
        }
    }

    pub fn add_block(&self, block: Block) {
        self.state.lock().unwrap().blocks.insert(block.block_num, block);
    }

    /// Serialized form returned for `trx_id`.
    pub fn set_transaction_bytes(&self, trx_id: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .tx_bytes
            .insert(trx_id.to_string(), bytes);
    }

    pub fn add_key_reference(&self, key: &str, account: &str) {
        self.state
            .lock()
            .unwrap()
            .key_refs
            .entry(key.to_string())
            .or_default()
            .push(AccountName::new(account));
    }

    pub fn set_native_per_vest(&self, rate: f64) {
        self.state.lock().unwrap().native_per_vest = rate;
    }

    pub fn set_fiat_per_rshare(&self, rate: f64) {
        self.state.lock().unwrap().fiat_per_rshare = rate;
    }

    /// The next `n` broadcasts fail with a transient error.
    pub fn fail_broadcasts(&self, n: u32) {
        self.state.lock().unwrap().failing_broadcasts = n;
    }

    /// The next `n` content reads fail with a transient error.
    pub fn fail_reads(&self, n: u32) {
        self.state.lock().unwrap().failing_reads = n;
    }

    /// The next `n` reads of one post fail with a transient error.
    pub fn fail_reads_of(&self, authorperm: &Authorperm, n: u32) {
        self.state
            .lock()
            .unwrap()
            .failing_content
            .insert(authorperm.clone(), n);
    }

    /// Broadcasts succeed but the votes never show up on chain.
    pub fn swallow_votes(&self, swallow: bool) {
        self.state.lock().unwrap().swallow_votes = swallow;
    }

    pub fn recorded_votes(&self) -> Vec<RecordedVote> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn broadcast_attempts(&self) -> u32 {
        self.state.lock().unwrap().broadcast_attempts
    }

    pub fn rotations(&self) -> u32 {
        self.state.lock().unwrap().rotations
    }

    pub fn capacity_of(&self, account: &str) -> Option<VoterCapacity> {
        self.state
            .lock()
            .unwrap()
            .capacities
            .get(&AccountName::new(account))
            .cloned()
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for NullChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn rotate_node(&self) {
        self.state.lock().unwrap().rotations += 1;
    }

    async fn head_block(&self) -> Result<(u64, Timestamp), ChainError> {
        let s = self.state.lock().unwrap();
        Ok((s.head, s.head_time))
    }

    async fn get_account(&self, id: &AccountName) -> Result<Option<ChainAccount>, ChainError> {
        Ok(self.state.lock().unwrap().accounts.get(id).cloned())
    }

    async fn get_capacity(&self, account: &AccountName) -> Result<VoterCapacity, ChainError> {
        self.state
            .lock()
            .unwrap()
            .capacities
            .get(account)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("account {account}")))
    }

    async fn get_content(&self, authorperm: &Authorperm) -> Result<Content, ChainError> {
        let mut s = self.state.lock().unwrap();
        if s.failing_reads > 0 {
            s.failing_reads -= 1;
            return Err(ChainError::Timeout);
        }
        if let Some(left) = s.failing_content.get_mut(authorperm).filter(|n| **n > 0) {
            *left -= 1;
            return Err(ChainError::Timeout);
        }
        s.contents
            .get(authorperm)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("content {authorperm}")))
    }

    async fn get_votes(&self, authorperm: &Authorperm) -> Result<Vec<ActiveVote>, ChainError> {
        Ok(self.get_content(authorperm).await?.active_votes)
    }

    async fn get_block(&self, block_num: u64) -> Result<Option<Block>, ChainError> {
        Ok(self.state.lock().unwrap().blocks.get(&block_num).cloned())
    }

    async fn transaction_bytes(&self, tx: &SignedTransaction) -> Result<Vec<u8>, ChainError> {
        self.state
            .lock()
            .unwrap()
            .tx_bytes
            .get(&tx.trx_id)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("transaction {}", tx.trx_id)))
    }

    async fn accounts_for_keys(&self, keys: &[String]) -> Result<Vec<AccountName>, ChainError> {
        let s = self.state.lock().unwrap();
        let mut out: Vec<AccountName> = keys
            .iter()
            .filter_map(|k| s.key_refs.get(k))
            .flatten()
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn vests_to_native(&self, vests: f64) -> Result<f64, ChainError> {
        Ok(vests * self.state.lock().unwrap().native_per_vest)
    }

    async fn rshares_to_fiat(&self, rshares: f64) -> Result<f64, ChainError> {
        Ok(rshares * self.state.lock().unwrap().fiat_per_rshare)
    }
}

#[async_trait]
impl VoteBroadcaster for NullChain {
    async fn broadcast_vote(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> Result<(), ChainError> {
        let mut s = self.state.lock().unwrap();
        s.broadcast_attempts += 1;
        if s.failing_broadcasts > 0 {
            s.failing_broadcasts -= 1;
            return Err(ChainError::Broadcast("node unavailable".into()));
        }

        let capacity = s
            .capacities
            .get(voter)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("account {voter}")))?;
        if !s.contents.contains_key(authorperm) {
            return Err(ChainError::NotFound(format!("content {authorperm}")));
        }

        let fraction = percentage.clamp(0.0, 100.0) / 100.0;
        let rshares = (capacity.available_rshares() * fraction).round() as i64;
        let drained = capacity.current_mana_pct * fraction / MANA_PER_FULL_VOTE_DIVISOR;
        if let Some(c) = s.capacities.get_mut(voter) {
            c.current_mana_pct = (c.current_mana_pct - drained).max(0.0);
        }

        s.recorded.push(RecordedVote {
            voter: voter.clone(),
            authorperm: authorperm.clone(),
            percentage,
            rshares,
        });
        if s.swallow_votes {
            return Ok(());
        }

        let time = s.head_time;
        if let Some(content) = s.contents.get_mut(authorperm) {
            let weight = rshares.max(0) as u64;
            content.total_vote_weight += weight;
            content.active_votes.push(ActiveVote {
                voter: voter.clone(),
                rshares,
                weight,
                percent: (percentage * 100.0).round() as i64,
                time,
            });
        }
        Ok(())
    }
}
