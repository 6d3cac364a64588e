//! Upvote sweep: pays pending member posts from the voter pool.

use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_store::ServiceStore;
use sbi_utils::{Clock, PassStats};
use sbi_voting::{DeliveryState, VoteScheduler, VotingError};

use crate::{RunnerError, Service};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepReport {
    pub considered: u64,
    pub delivered: u64,
    pub skipped: u64,
    pub failed: u64,
    pub delivered_rshares: i64,
}

const STAT_NAMES: &[&str] = &["considered", "delivered", "skipped", "failed"];

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// One scheduling pass over every unvoted, unfiltered pending post,
    /// oldest first. Each member is paid at most once per pass.
    pub async fn run_upvote_sweep(&self) -> Result<SweepReport, RunnerError> {
        let now = self.clock.now();
        let stats = PassStats::new(STAT_NAMES);

        let mut scheduler = VoteScheduler::new(
            self.chain.as_ref(),
            self.broadcaster.as_ref(),
            self.store.as_ref(),
            &self.pool,
            &self.params,
            &self.config.delivery,
        )
        .with_dry_run(self.config.dry_run);
        scheduler.begin_pass();

        let mut delivered_rshares = 0;
        for post in self.store.unvoted_posts()? {
            stats.increment("considered");
            match scheduler.pay_post(&post, now).await {
                Ok(payout) => match payout.state {
                    DeliveryState::Delivered => {
                        stats.increment("delivered");
                        delivered_rshares += payout.delivered_rshares;
                        tracing::info!(
                            member = %payout.member,
                            post = %payout.authorperm,
                            rshares = payout.delivered_rshares,
                            target = payout.target_rshares,
                            votes = payout.votes.len(),
                            "payout delivered"
                        );
                    }
                    DeliveryState::Failed => {
                        stats.increment("failed");
                        tracing::warn!(post = %payout.authorperm, "every vote attempt failed");
                    }
                    _ => stats.increment("skipped"),
                },
                Err(VotingError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    stats.increment("failed");
                    tracing::warn!(post = %post.authorperm, error = %e, "could not pay post");
                }
            }
        }

        tracing::info!(stats = %stats.summary(), delivered_rshares, "upvote sweep complete");
        Ok(SweepReport {
            considered: stats.get("considered"),
            delivered: stats.get("delivered"),
            skipped: stats.get("skipped"),
            failed: stats.get("failed"),
            delivered_rshares,
        })
    }
}
