//! Signer-recovery based vote-buying detector.

use serde::{Deserialize, Serialize};

use sbi_chain::types::{ChainOp, SignedTransaction};
use sbi_chain::ChainClient;
use sbi_crypto::{
    format_public_key, parse_chain_id, recover_signers, split_signatures, transaction_digest,
};
use sbi_store::MemberStore;
use sbi_types::time::SECS_PER_DAY;
use sbi_types::{AccountName, ActiveVote, Authorperm, Timestamp};

use crate::AbuseError;

/// Blocks searched around the estimated block, nearest first.
pub const BLOCK_SEARCH_OFFSETS: [i64; 11] = [0, 1, -1, 2, -2, 3, -3, 4, -4, 5, -5];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbuseConfig {
    /// Votes at or below this size are never scanned.
    #[serde(default = "default_min_rshares")]
    pub min_rshares: i64,
    /// Votes older than this are past reward finalization and not scanned.
    #[serde(default = "default_max_vote_age_days")]
    pub max_vote_age_days: u64,
    /// Sweeps a flagged member sits out.
    #[serde(default = "default_skip_rounds")]
    pub skip_rounds: u32,
}

fn default_min_rshares() -> i64 {
    50_000_000
}

fn default_max_vote_age_days() -> u64 {
    7
}

fn default_skip_rounds() -> u32 {
    10
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            min_rshares: default_min_rshares(),
            max_vote_age_days: default_max_vote_age_days(),
            skip_rounds: default_skip_rounds(),
        }
    }
}

/// A vote-selling service found among a transaction's signers.
#[derive(Clone, Debug, PartialEq)]
pub struct FlaggedService {
    pub service: AccountName,
    pub voter: AccountName,
    pub authorperm: Authorperm,
    pub trx_id: String,
    pub block_num: u64,
}

pub struct AbuseDetector<'a, C: ?Sized> {
    chain: &'a C,
    blocklist: &'a [AccountName],
    config: AbuseConfig,
}

impl<'a, C: ChainClient + ?Sized> AbuseDetector<'a, C> {
    pub fn new(chain: &'a C, blocklist: &'a [AccountName], config: AbuseConfig) -> Self {
        Self {
            chain,
            blocklist,
            config,
        }
    }

    /// Whether `vote` is large and fresh enough to be worth tracing.
    pub fn is_candidate(&self, vote: &ActiveVote, now: Timestamp) -> bool {
        vote.rshares > self.config.min_rshares
            && vote.time.elapsed_since(now) <= self.config.max_vote_age_days * SECS_PER_DAY
    }

    /// Trace `vote` on `authorperm` to its transaction and look for a
    /// blocklisted signer.
    pub async fn scan(
        &self,
        authorperm: &Authorperm,
        vote: &ActiveVote,
    ) -> Result<Option<FlaggedService>, AbuseError> {
        let Some((block_num, tx)) = self.find_transaction(authorperm, &vote.voter, vote.time).await?
        else {
            tracing::debug!(voter = %vote.voter, post = %authorperm, "vote transaction not found");
            return Ok(None);
        };

        let signers = self.signer_accounts(&tx).await?;
        tracing::debug!(trx_id = %tx.trx_id, signers = ?signers, "recovered signers");

        Ok(signers
            .into_iter()
            .find(|a| self.blocklist.contains(a))
            .map(|service| FlaggedService {
                service,
                voter: vote.voter.clone(),
                authorperm: authorperm.clone(),
                trx_id: tx.trx_id.clone(),
                block_num,
            }))
    }

    /// Scan a vote on a member's post and quarantine the author on a hit.
    ///
    /// Never fails: lookup and recovery errors are logged and treated as
    /// "nothing found".
    pub async fn check_vote<S: MemberStore + ?Sized>(
        &self,
        store: &S,
        authorperm: &Authorperm,
        vote: &ActiveVote,
        now: Timestamp,
    ) -> Option<FlaggedService> {
        if !self.is_candidate(vote, now) {
            return None;
        }
        let flagged = match self.scan(authorperm, vote).await {
            Ok(Some(flagged)) => flagged,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(voter = %vote.voter, post = %authorperm, error = %e, "abuse scan failed");
                return None;
            }
        };

        if let Err(e) = self.quarantine(store, &flagged) {
            tracing::warn!(member = %authorperm.author, error = %e, "could not quarantine member");
        }
        Some(flagged)
    }

    fn quarantine<S: MemberStore + ?Sized>(
        &self,
        store: &S,
        flagged: &FlaggedService,
    ) -> Result<(), AbuseError> {
        let Some(mut member) = store.get_member(&flagged.authorperm.author)? else {
            return Ok(());
        };
        member.quarantine(
            format!("Vote bought from {}", flagged.service),
            self.config.skip_rounds,
        );
        store.put_member(&member)?;
        tracing::warn!(
            member = %member.id,
            service = %flagged.service,
            trx_id = %flagged.trx_id,
            "member quarantined for bought vote"
        );
        Ok(())
    }

    async fn find_transaction(
        &self,
        authorperm: &Authorperm,
        voter: &AccountName,
        at: Timestamp,
    ) -> Result<Option<(u64, SignedTransaction)>, AbuseError> {
        let estimate = self.chain.estimate_block_num(at).await?;
        let head = self.chain.head_block_num().await?;

        for offset in BLOCK_SEARCH_OFFSETS {
            let Some(num) = estimate.checked_add_signed(offset) else {
                continue;
            };
            if num > head {
                continue;
            }
            let Some(block) = self.chain.get_block(num).await? else {
                continue;
            };
            let found = block
                .transactions
                .into_iter()
                .find(|tx| tx.operations.iter().any(|op| is_vote_by(op, voter, authorperm)));
            if let Some(tx) = found {
                return Ok(Some((num, tx)));
            }
        }
        Ok(None)
    }

    async fn signer_accounts(&self, tx: &SignedTransaction) -> Result<Vec<AccountName>, AbuseError> {
        let signed = self.chain.transaction_bytes(tx).await?;
        let unsigned = split_signatures(&signed, &tx.signatures)?;
        let chain_id = parse_chain_id(self.chain.chain_id())?;
        let digest = transaction_digest(&chain_id, unsigned);

        let keys: Vec<String> = recover_signers(&digest, &tx.signatures)
            .iter()
            .map(|k| format_public_key(k, self.chain.key_prefix()))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.chain.accounts_for_keys(&keys).await?)
    }
}

fn is_vote_by(op: &ChainOp, voter: &AccountName, authorperm: &Authorperm) -> bool {
    matches!(
        op,
        ChainOp::Vote { voter: v, permlink, .. } if v == voter && permlink == &authorperm.permlink
    )
}
