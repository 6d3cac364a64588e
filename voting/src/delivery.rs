//! Vote delivery: submit, confirm, retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sbi_chain::{ChainClient, ChainError, RetryPolicy, VoteBroadcaster};
use sbi_types::{AccountName, ActiveVote, Authorperm, VoteOutcome};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Time given to the network to include a vote before checking for it.
    #[serde(default = "default_confirm_wait_ms")]
    pub confirm_wait_ms: u64,
}

fn default_confirm_wait_ms() -> u64 {
    6_000
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            confirm_wait_ms: default_confirm_wait_ms(),
        }
    }
}

impl DeliveryConfig {
    /// No waiting anywhere. For tests and local chains.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            retry: RetryPolicy::immediate(max_attempts),
            confirm_wait_ms: 0,
        }
    }

    fn confirm_wait(&self) -> Duration {
        Duration::from_millis(self.confirm_wait_ms)
    }
}

/// Where a payout target is in its lifecycle.
///
/// `Selecting → {Delivering → Delivered | Retrying → Failed} | Skipped`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    Selecting,
    Delivering,
    Retrying,
    Delivered,
    Failed,
    Skipped,
}

/// Delivers one vote from one voter with bounded retries.
///
/// Each attempt first checks whether the voter's vote is already on the
/// post, so a broadcast that landed but could not be confirmed is never
/// repeated. Between attempts the chain client rotates to another node.
pub struct VoteSubmitter<'a, C: ?Sized, B: ?Sized> {
    chain: &'a C,
    broadcaster: &'a B,
    config: &'a DeliveryConfig,
    state: DeliveryState,
    attempts: u32,
}

impl<'a, C, B> VoteSubmitter<'a, C, B>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
{
    pub fn new(chain: &'a C, broadcaster: &'a B, config: &'a DeliveryConfig) -> Self {
        Self {
            chain,
            broadcaster,
            config,
            state: DeliveryState::Selecting,
            attempts: 0,
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn transition(&mut self, next: DeliveryState) {
        if self.state != next {
            tracing::trace!(from = ?self.state, to = ?next, "delivery state");
        }
        self.state = next;
    }

    /// Submit `percentage` from `voter` on `authorperm` and wait until the
    /// vote is visible. The balance is never touched here.
    pub async fn deliver(
        &mut self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> VoteOutcome {
        self.transition(DeliveryState::Delivering);
        let config = self.config;
        let retry = &config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let result = loop {
            self.attempts += 1;
            match self.attempt(voter, authorperm, percentage).await {
                Ok(vote) => break Ok(vote),
                Err(e) if e.is_transient() && self.attempts < max_attempts => {
                    tracing::debug!(
                        attempt = self.attempts,
                        error = %e,
                        "vote attempt failed, retrying"
                    );
                    self.transition(DeliveryState::Retrying);
                    self.chain.rotate_node();
                    tokio::time::sleep(retry.backoff()).await;
                }
                Err(e) => break Err(e),
            }
        };

        match result {
            Ok(vote) => {
                self.transition(DeliveryState::Delivered);
                tracing::info!(
                    voter = %voter,
                    post = %authorperm,
                    percentage,
                    rshares = vote.rshares,
                    "vote delivered"
                );
                VoteOutcome::Voted {
                    delivered_rshares: vote.rshares,
                    voted_at: vote.time,
                }
            }
            Err(e) => {
                self.transition(DeliveryState::Failed);
                tracing::warn!(
                    voter = %voter,
                    post = %authorperm,
                    attempts = self.attempts,
                    error = %e,
                    "vote delivery failed"
                );
                VoteOutcome::Failed {
                    attempts: self.attempts,
                }
            }
        }
    }

    async fn attempt(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> Result<ActiveVote, ChainError> {
        if let Some(vote) = self.find_vote(voter, authorperm).await? {
            return Ok(vote);
        }
        self.broadcaster
            .broadcast_vote(voter, authorperm, percentage)
            .await?;
        tokio::time::sleep(self.config.confirm_wait()).await;

        self.find_vote(voter, authorperm)
            .await?
            .ok_or_else(|| {
                ChainError::Broadcast(format!("vote by {voter} on {authorperm} not confirmed"))
            })
    }

    async fn find_vote(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
    ) -> Result<Option<ActiveVote>, ChainError> {
        let votes = self.chain.get_votes(authorperm).await?;
        Ok(votes.into_iter().find(|v| &v.voter == voter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_chain::types::Content;
    use sbi_nullables::NullChain;
    use sbi_types::Timestamp;

    fn setup() -> (NullChain, Authorperm) {
        let chain = NullChain::new();
        chain.set_head(100, Timestamp::new(1_000));
        chain.set_capacity("pool", 5_000.0, 100.0);
        let ap = Authorperm::new("alice", "hello");
        chain.add_content(Content {
            authorperm: ap.clone(),
            created: Timestamp::new(700),
            parent_author: String::new(),
            tags: vec![],
            app: None,
            body: String::new(),
            pending_payout_value: 0.0,
            total_vote_weight: 0,
            active_votes: vec![],
        });
        (chain, ap)
    }

    #[tokio::test]
    async fn delivers_and_reports_actual_rshares() {
        let (chain, ap) = setup();
        let config = DeliveryConfig::immediate(5);
        let mut submitter = VoteSubmitter::new(&chain, &chain, &config);

        let outcome = submitter.deliver(&"pool".into(), &ap, 50.0).await;
        assert_eq!(
            outcome,
            VoteOutcome::Voted {
                delivered_rshares: 50,
                voted_at: Timestamp::new(1_000)
            }
        );
        assert_eq!(submitter.state(), DeliveryState::Delivered);
        assert_eq!(submitter.attempts(), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_with_rotation() {
        let (chain, ap) = setup();
        chain.fail_broadcasts(2);
        let config = DeliveryConfig::immediate(5);
        let mut submitter = VoteSubmitter::new(&chain, &chain, &config);

        let outcome = submitter.deliver(&"pool".into(), &ap, 10.0).await;
        assert!(matches!(outcome, VoteOutcome::Voted { .. }));
        assert_eq!(submitter.state(), DeliveryState::Delivered);
        assert_eq!(submitter.attempts(), 3);
        assert_eq!(chain.rotations(), 2);
        assert_eq!(chain.recorded_votes().len(), 1);
    }

    #[tokio::test]
    async fn unconfirmed_votes_fail_after_five_attempts() {
        let (chain, ap) = setup();
        chain.swallow_votes(true);
        let config = DeliveryConfig::immediate(5);
        let mut submitter = VoteSubmitter::new(&chain, &chain, &config);

        let outcome = submitter.deliver(&"pool".into(), &ap, 10.0).await;
        assert_eq!(outcome, VoteOutcome::Failed { attempts: 5 });
        assert_eq!(submitter.state(), DeliveryState::Failed);
        assert_eq!(chain.rotations(), 4);
    }

    #[tokio::test]
    async fn existing_vote_is_not_rebroadcast() {
        let (chain, ap) = setup();
        chain.add_vote(
            &ap,
            ActiveVote {
                voter: "pool".into(),
                rshares: 77,
                weight: 77,
                percent: 1_000,
                time: Timestamp::new(900),
            },
        );
        let config = DeliveryConfig::immediate(5);
        let mut submitter = VoteSubmitter::new(&chain, &chain, &config);

        let outcome = submitter.deliver(&"pool".into(), &ap, 10.0).await;
        assert!(matches!(outcome, VoteOutcome::Voted { delivered_rshares: 77, .. }));
        assert_eq!(chain.broadcast_attempts(), 0);
    }

    #[tokio::test]
    async fn missing_post_fails_without_retry() {
        let chain = NullChain::new();
        chain.set_capacity("pool", 5_000.0, 100.0);
        let config = DeliveryConfig::immediate(5);
        let mut submitter = VoteSubmitter::new(&chain, &chain, &config);

        let outcome = submitter
            .deliver(&"pool".into(), &Authorperm::new("ghost", "x"), 10.0)
            .await;
        assert_eq!(outcome, VoteOutcome::Failed { attempts: 1 });
    }
}
