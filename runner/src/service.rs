//! The service context every job runs against.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_ledger::LedgerError;
use sbi_store::{ConfigStore, ServiceStore};
use sbi_types::{AccountName, RewardParams};
use sbi_utils::Clock;
use sbi_voting::VoterPool;

use crate::{RunnerConfig, RunnerError, ShutdownSignal};

/// Chain access, storage, time and configuration, bundled for the jobs.
///
/// Jobs are methods on this type and run one at a time; nothing here is
/// shared with another scheduler.
pub struct Service<C: ?Sized, B: ?Sized, S, K> {
    pub(crate) chain: Arc<C>,
    pub(crate) broadcaster: Arc<B>,
    pub(crate) store: Arc<S>,
    pub(crate) clock: Arc<K>,
    pub(crate) config: RunnerConfig,
    pub(crate) params: RewardParams,
    pub(crate) pool: VoterPool,
    pub(crate) management: BTreeMap<AccountName, u64>,
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Fails when the reward parameters are invalid or no voter is
    /// configured. Both are fatal for the process.
    pub fn new(
        config: RunnerConfig,
        chain: Arc<C>,
        broadcaster: Arc<B>,
        store: Arc<S>,
        clock: Arc<K>,
    ) -> Result<Self, RunnerError> {
        let params = load_params(store.as_ref(), &config.params)?;
        let pool = VoterPool::new(config.voter_accounts.clone())?;
        let management = config.management_allocation();
        Ok(Self {
            chain,
            broadcaster,
            store,
            clock,
            config,
            params,
            pool,
            management,
        })
    }

    pub fn params(&self) -> &RewardParams {
        &self.params
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run every job on its own interval until `shutdown` fires.
    ///
    /// A failing job is logged and retried on its next tick. Storage
    /// errors end the loop.
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<(), RunnerError> {
        let schedule = &self.config.schedule;
        let mut cycle = job_interval(schedule.cycle_check_secs);
        let mut stream = job_interval(schedule.stream_secs);
        let mut upvote = job_interval(schedule.upvote_secs);
        let mut watch = job_interval(schedule.watch_secs);
        let mut stop = shutdown.subscribe();

        tracing::info!(
            voters = self.pool.voters().len(),
            dry_run = self.config.dry_run,
            "reward service started"
        );

        while !shutdown.is_triggered() {
            tokio::select! {
                _ = stop.changed() => break,
                _ = cycle.tick() => {
                    absorb("ledger cycle", self.run_ledger_cycle().await.map(|_| ()))?;
                }
                _ = stream.tick() => {
                    absorb("post stream", self.run_stream_posts().await.map(|_| ()))?;
                }
                _ = upvote.tick() => {
                    absorb("upvote sweep", self.run_upvote_sweep().await.map(|_| ()))?;
                }
                _ = watch.tick() => {
                    absorb("vote watcher", self.run_vote_watch().await.map(|_| ()))?;
                }
            }
        }

        tracing::info!("reward service stopped");
        Ok(())
    }
}

/// Stored parameters win; the config table only seeds an empty store.
pub fn load_params<S: ConfigStore + ?Sized>(
    store: &S,
    seed: &RewardParams,
) -> Result<RewardParams, RunnerError> {
    let params = match store.get_params()? {
        Some(stored) => stored,
        None => {
            seed.validate().map_err(LedgerError::InvalidParams)?;
            store.put_params(seed)?;
            tracing::info!("seeded reward parameters from config");
            seed.clone()
        }
    };
    params.validate().map_err(LedgerError::InvalidParams)?;
    Ok(params)
}

fn job_interval(secs: u64) -> tokio::time::Interval {
    let mut timer = interval(Duration::from_secs(secs.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

fn absorb(job: &'static str, result: Result<(), RunnerError>) -> Result<(), RunnerError> {
    match result {
        Ok(()) => Ok(()),
        Err(RunnerError::Store(e)) => Err(RunnerError::Store(e)),
        Err(e) => {
            tracing::warn!(job, error = %e, "job failed, retrying on next tick");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_nullables::NullStore;

    #[test]
    fn empty_store_is_seeded_from_config() {
        let store = NullStore::new();
        let seed = RewardParams {
            share_cycle_min: 60.0,
            ..RewardParams::default()
        };
        let params = load_params(&store, &seed).unwrap();
        assert_eq!(params.share_cycle_min, 60.0);
        assert_eq!(store.get_params().unwrap(), Some(seed));
    }

    #[test]
    fn stored_params_win_over_config() {
        let stored = RewardParams {
            comment_vote_divider: 8.0,
            ..RewardParams::default()
        };
        let store = NullStore::with_params(stored.clone());
        let params = load_params(&store, &RewardParams::default()).unwrap();
        assert_eq!(params, stored);
    }

    #[test]
    fn invalid_params_are_fatal() {
        let store = NullStore::new();
        let seed = RewardParams {
            minimum_vote_threshold: 0.0,
            ..RewardParams::default()
        };
        let err = load_params(&store, &seed).unwrap_err();
        assert!(matches!(err, RunnerError::Ledger(LedgerError::InvalidParams(_))));
        assert_eq!(store.get_params().unwrap(), None);
    }
}
