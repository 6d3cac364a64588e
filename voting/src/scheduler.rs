//! Vote scheduler: matches a member's payout to voter capacity.

use std::collections::BTreeSet;

use sbi_chain::{ChainClient, VoteBroadcaster};
use sbi_store::{MemberStore, PostStore, VoteDelivery};
use sbi_types::{
    AccountName, ActiveVote, Authorperm, PendingPost, RewardParams, ScheduledVote, Timestamp,
    VoteOutcome,
};

use crate::delivery::{DeliveryConfig, DeliveryState, VoteSubmitter};
use crate::planner::{plan_votes, select_fast_path, select_pool_voter, PlannedVote};
use crate::pool::VoterPool;
use crate::targets::{schedule_check, SkipReason};
use crate::VotingError;

/// What happened to one pending post.
#[derive(Clone, Debug, PartialEq)]
pub struct PostPayout {
    pub authorperm: Authorperm,
    pub member: AccountName,
    pub target_rshares: f64,
    pub votes: Vec<ScheduledVote>,
    pub delivered_rshares: i64,
    pub state: DeliveryState,
    pub skipped: Option<SkipReason>,
}

impl PostPayout {
    fn new(post: &PendingPost, target_rshares: f64) -> Self {
        Self {
            authorperm: post.authorperm.clone(),
            member: post.author.clone(),
            target_rshares,
            votes: Vec::new(),
            delivered_rshares: 0,
            state: DeliveryState::Selecting,
            skipped: None,
        }
    }

    fn skipped(post: &PendingPost, reason: SkipReason) -> Self {
        Self {
            state: DeliveryState::Skipped,
            skipped: Some(reason),
            ..Self::new(post, 0.0)
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.state == DeliveryState::Delivered
    }
}

/// Runs one scheduling pass over pending posts.
///
/// A member is paid at most once per pass. Only confirmed votes reduce the
/// member's balance, by the rshares the chain reports, through
/// [`MemberStore::record_vote_delivery`].
pub struct VoteScheduler<'a, C: ?Sized, B: ?Sized, S: ?Sized> {
    chain: &'a C,
    broadcaster: &'a B,
    store: &'a S,
    pool: &'a VoterPool,
    params: &'a RewardParams,
    delivery: &'a DeliveryConfig,
    dry_run: bool,
    paid_this_pass: BTreeSet<AccountName>,
}

impl<'a, C, B, S> VoteScheduler<'a, C, B, S>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: MemberStore + PostStore + ?Sized,
{
    pub fn new(
        chain: &'a C,
        broadcaster: &'a B,
        store: &'a S,
        pool: &'a VoterPool,
        params: &'a RewardParams,
        delivery: &'a DeliveryConfig,
    ) -> Self {
        Self {
            chain,
            broadcaster,
            store,
            pool,
            params,
            delivery,
            dry_run: false,
            paid_this_pass: BTreeSet::new(),
        }
    }

    /// Plan and log votes without broadcasting or touching balances.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Start a new pass: members paid in the previous one become eligible.
    pub fn begin_pass(&mut self) {
        self.paid_this_pass.clear();
    }

    pub fn paid_this_pass(&self) -> &BTreeSet<AccountName> {
        &self.paid_this_pass
    }

    pub async fn pay_post(
        &mut self,
        post: &PendingPost,
        now: Timestamp,
    ) -> Result<PostPayout, VotingError> {
        if self.paid_this_pass.contains(&post.author) {
            return Ok(PostPayout::skipped(post, SkipReason::AlreadyPaidThisPass));
        }
        let Some(member) = self.store.get_member(&post.author)? else {
            return self.retire(post, SkipReason::NotMember);
        };
        let target = match schedule_check(&member, post, self.params, now) {
            Ok(target) => target,
            Err(reason) => return self.retire(post, reason),
        };

        let votes = self
            .delivery
            .retry
            .run(|| self.chain.rotate_node(), || self.chain.get_votes(&post.authorperm))
            .await?;
        if let Some(existing) = votes.iter().find(|v| self.pool.contains(&v.voter)) {
            self.settle_unbilled_votes(member.last_received_vote, post, &votes)?;
            let voted_after = post.created.elapsed_since(existing.time) as f64;
            self.store
                .mark_voted(&post.authorperm, true, Some(voted_after))?;
            return Ok(PostPayout::skipped(post, SkipReason::AlreadyVoted));
        }

        if self.dry_run {
            return Ok(self.plan_only(post, target).await);
        }

        let mut payout = PostPayout::new(post, target);
        let capacities = self.pool.refresh(self.chain, &BTreeSet::new()).await;
        if let Some(single) = select_fast_path(target, &capacities) {
            self.cast(&mut payout, post, single).await?;
        } else {
            tracing::info!(member = %post.author, target, "no single voter covers target, pooling");
            let mut used = BTreeSet::new();
            let mut remaining = target;
            while remaining > 0.0 {
                let capacities = self.pool.refresh(self.chain, &used).await;
                let Some(pick) = select_pool_voter(remaining, &capacities) else {
                    break;
                };
                used.insert(pick.voter.clone());
                if let Some(delivered) = self.cast(&mut payout, post, pick).await? {
                    remaining -= delivered as f64;
                }
            }
            if remaining > 0.0 && !payout.votes.is_empty() {
                tracing::info!(member = %post.author, remaining, "pool exhausted, deficit carried over");
            }
        }

        if payout.votes.is_empty() {
            tracing::debug!(member = %post.author, target, "no voter has capacity");
            return Ok(PostPayout::skipped(post, SkipReason::NoCapacity));
        }

        let first_vote = payout.votes.iter().find_map(|v| match v.outcome {
            Some(VoteOutcome::Voted { voted_at, .. }) => Some(voted_at),
            _ => None,
        });
        match first_vote {
            Some(voted_at) => {
                payout.state = DeliveryState::Delivered;
                self.paid_this_pass.insert(post.author.clone());
                let voted_after = post.created.elapsed_since(voted_at) as f64;
                self.store
                    .mark_voted(&post.authorperm, true, Some(voted_after))?;
            }
            None => payout.state = DeliveryState::Failed,
        }
        Ok(payout)
    }

    /// Deliver one planned vote. Returns the rshares delivered, if any.
    async fn cast(
        &self,
        payout: &mut PostPayout,
        post: &PendingPost,
        planned: PlannedVote,
    ) -> Result<Option<i64>, VotingError> {
        tracing::info!(
            member = %post.author,
            voter = %planned.voter,
            post = %post.authorperm,
            percentage = planned.percentage,
            "upvoting"
        );
        let mut submitter = VoteSubmitter::new(self.chain, self.broadcaster, self.delivery);
        let outcome = submitter
            .deliver(&planned.voter, &post.authorperm, planned.percentage)
            .await;

        let delivered = match outcome {
            VoteOutcome::Voted {
                delivered_rshares,
                voted_at,
            } => {
                self.store.record_vote_delivery(
                    &post.author,
                    &VoteDelivery {
                        delivered_rshares,
                        voted_at,
                    },
                )?;
                payout.delivered_rshares += delivered_rshares;
                Some(delivered_rshares)
            }
            _ => None,
        };

        payout.votes.push(ScheduledVote {
            authorperm: post.authorperm.clone(),
            voter: planned.voter,
            vote_percentage: planned.percentage,
            target_rshares: planned.rshares,
            outcome: Some(outcome),
        });
        Ok(delivered)
    }

    /// Debit pool votes that landed after the member's last recorded
    /// payout. They exist when a vote went through but the debit that
    /// should have followed it failed.
    fn settle_unbilled_votes(
        &self,
        last_received_vote: Option<Timestamp>,
        post: &PendingPost,
        votes: &[ActiveVote],
    ) -> Result<(), VotingError> {
        let unbilled = votes.iter().filter(|v| {
            self.pool.contains(&v.voter) && last_received_vote.map_or(true, |t| v.time > t)
        });
        for vote in unbilled {
            tracing::warn!(
                member = %post.author,
                voter = %vote.voter,
                post = %post.authorperm,
                rshares = vote.rshares,
                "debiting a delivered vote that was never recorded"
            );
            self.store.record_vote_delivery(
                &post.author,
                &VoteDelivery {
                    delivered_rshares: vote.rshares,
                    voted_at: vote.time,
                },
            )?;
        }
        Ok(())
    }

    async fn plan_only(&self, post: &PendingPost, target: f64) -> PostPayout {
        let capacities = self.pool.refresh(self.chain, &BTreeSet::new()).await;
        let mut payout = PostPayout::new(post, target);
        payout.state = DeliveryState::Skipped;
        for vote in plan_votes(target, &capacities) {
            tracing::info!(
                dry_run = true,
                member = %post.author,
                voter = %vote.voter,
                post = %post.authorperm,
                percentage = vote.percentage,
                "would upvote"
            );
            payout.votes.push(ScheduledVote {
                authorperm: post.authorperm.clone(),
                voter: vote.voter,
                vote_percentage: vote.percentage,
                target_rshares: vote.rshares,
                outcome: Some(VoteOutcome::Skipped {
                    reason: "dry run".into(),
                }),
            });
        }
        payout
    }

    /// Record a skip. Final reasons retire the post so later sweeps ignore it.
    fn retire(&self, post: &PendingPost, reason: SkipReason) -> Result<PostPayout, VotingError> {
        tracing::debug!(post = %post.authorperm, reason = %reason, "skipping post");
        if reason.is_final() {
            let mut retired = post.clone();
            retired.skip = true;
            if reason == SkipReason::StaleComment {
                retired.stale = true;
            }
            self.store.put_post(&retired)?;
        }
        Ok(PostPayout::skipped(post, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbi_chain::types::Content;
    use sbi_nullables::{NullChain, NullStore};
    use sbi_types::MemberState;

    const NOW: u64 = 10_000;

    fn params() -> RewardParams {
        RewardParams {
            minimum_vote_threshold: 100.0,
            comment_vote_divider: 2.0,
            ..RewardParams::default()
        }
    }

    fn member(name: &str, balance: i64) -> MemberState {
        let mut m = MemberState::new(AccountName::new(name));
        m.shares = 1;
        m.subscribed_rshares = balance;
        m.balance_rshares = balance;
        m
    }

    fn post(author: &str, permlink: &str) -> PendingPost {
        PendingPost {
            authorperm: Authorperm::new(author, permlink),
            author: AccountName::new(author),
            created: Timestamp::new(NOW - 400),
            block: 1,
            main_post: true,
            voted: false,
            skip: false,
            stale: false,
            vote_delay: 300.0,
            voted_after: None,
        }
    }

    fn content(p: &PendingPost) -> Content {
        Content {
            authorperm: p.authorperm.clone(),
            created: p.created,
            parent_author: String::new(),
            tags: vec![],
            app: None,
            body: String::new(),
            pending_payout_value: 0.0,
            total_vote_weight: 0,
            active_votes: vec![],
        }
    }

    struct Fixture {
        chain: NullChain,
        store: NullStore,
        pool: VoterPool,
        params: RewardParams,
        delivery: DeliveryConfig,
    }

    impl Fixture {
        /// Voters with the given full-vote rshares, all at 100% mana.
        fn new(voters: &[(&str, f64)]) -> Self {
            let chain = NullChain::new();
            chain.set_head(100, Timestamp::new(NOW));
            for (name, rshares) in voters {
                chain.set_capacity(name, rshares * 50.0, 100.0);
            }
            let pool = VoterPool::new(voters.iter().map(|(n, _)| AccountName::new(*n)).collect())
                .unwrap();
            Self {
                chain,
                store: NullStore::new(),
                pool,
                params: params(),
                delivery: DeliveryConfig::immediate(5),
            }
        }

        fn add_post(&self, p: &PendingPost) {
            self.chain.add_content(content(p));
            self.store.put_post(p).unwrap();
        }

        fn scheduler(&self) -> VoteScheduler<'_, NullChain, NullChain, NullStore> {
            VoteScheduler::new(
                &self.chain,
                &self.chain,
                &self.store,
                &self.pool,
                &self.params,
                &self.delivery,
            )
        }

        fn balance(&self, name: &str) -> i64 {
            self.store
                .get_member(&AccountName::new(name))
                .unwrap()
                .unwrap()
                .balance_rshares
        }
    }

    #[tokio::test]
    async fn single_voter_pays_target_and_decrements_balance() {
        let fx = Fixture::new(&[("pool-a", 5_000.0)]);
        fx.store.put_member(&member("alice", 2_000)).unwrap();
        let p = post("alice", "hello");
        fx.add_post(&p);

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        assert!(payout.is_delivered());
        assert_eq!(payout.votes.len(), 1);
        assert_eq!(payout.delivered_rshares, 1_000);
        assert_eq!(fx.balance("alice"), 1_000);

        let stored = fx.store.get_post(&p.authorperm).unwrap().unwrap();
        assert!(stored.voted);
        assert_eq!(stored.voted_after, Some(400.0));
    }

    #[tokio::test]
    async fn pool_fallback_drains_largest_first() {
        let fx = Fixture::new(&[("a", 50.0), ("b", 40.0), ("c", 60.0)]);
        fx.store.put_member(&member("alice", 240)).unwrap();
        let p = post("alice", "hello");
        fx.add_post(&p);

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        let voters: Vec<&str> = payout.votes.iter().map(|v| v.voter.as_str()).collect();
        assert_eq!(voters, vec!["c", "a", "b"]);
        assert_eq!(payout.delivered_rshares, 120);
        assert_eq!(fx.balance("alice"), 120);
        assert!((payout.votes[2].vote_percentage - 25.0).abs() < 1e-9);
    }

    fn pool_vote(rshares: i64, time: u64) -> ActiveVote {
        ActiveVote {
            voter: "pool-a".into(),
            rshares,
            weight: rshares as u64,
            percent: 100,
            time: Timestamp::new(time),
        }
    }

    #[tokio::test]
    async fn already_voted_post_is_a_no_op() {
        let fx = Fixture::new(&[("pool-a", 5_000.0)]);
        let mut alice = member("alice", 2_000);
        alice.last_received_vote = Some(Timestamp::new(NOW - 1_000));
        fx.store.put_member(&alice).unwrap();
        let mut p = post("alice", "hello");
        p.created = Timestamp::new(NOW - 1_300);
        fx.add_post(&p);
        fx.chain.add_vote(&p.authorperm, pool_vote(10, NOW - 1_000));

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        assert_eq!(payout.skipped, Some(SkipReason::AlreadyVoted));
        assert_eq!(fx.chain.broadcast_attempts(), 0);
        assert_eq!(fx.balance("alice"), 2_000);
        let stored = fx.store.get_post(&p.authorperm).unwrap().unwrap();
        assert_eq!(stored.voted_after, Some(300.0));
    }

    #[tokio::test]
    async fn landed_vote_without_debit_is_charged_once() {
        let fx = Fixture::new(&[("pool-a", 5_000.0)]);
        fx.store.put_member(&member("alice", 2_000)).unwrap();
        let p = post("alice", "hello");
        fx.add_post(&p);
        // The vote is on chain but the member row never saw it.
        fx.chain.add_vote(&p.authorperm, pool_vote(1_000, NOW - 100));

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        assert_eq!(payout.skipped, Some(SkipReason::AlreadyVoted));
        assert_eq!(fx.chain.broadcast_attempts(), 0);
        assert_eq!(fx.balance("alice"), 1_000);
        let alice = fx.store.get_member(&AccountName::new("alice")).unwrap().unwrap();
        assert_eq!(alice.last_received_vote, Some(Timestamp::new(NOW - 100)));
        assert!(alice.invariant_violation().is_none());

        // Asking again does not charge a second time.
        let mut retry = p.clone();
        retry.voted = false;
        fx.store.put_post(&retry).unwrap();
        let mut scheduler = fx.scheduler();
        scheduler.pay_post(&retry, Timestamp::new(NOW + 1_000)).await.unwrap();
        assert_eq!(fx.balance("alice"), 1_000);
    }

    #[tokio::test]
    async fn member_is_paid_once_per_pass() {
        let fx = Fixture::new(&[("pool-a", 50_000.0)]);
        fx.store.put_member(&member("alice", 8_000)).unwrap();
        let first = post("alice", "one");
        let second = post("alice", "two");
        fx.add_post(&first);
        fx.add_post(&second);

        let mut scheduler = fx.scheduler();
        assert!(scheduler.pay_post(&first, Timestamp::new(NOW)).await.unwrap().is_delivered());
        let again = scheduler.pay_post(&second, Timestamp::new(NOW)).await.unwrap();
        assert_eq!(again.skipped, Some(SkipReason::AlreadyPaidThisPass));
        assert_eq!(fx.chain.recorded_votes().len(), 1);
    }

    #[tokio::test]
    async fn second_member_sees_mana_drained_by_first() {
        let fx = Fixture::new(&[("pool-a", 1_000.0)]);
        fx.store.put_member(&member("alice", 1_000)).unwrap();
        fx.store.put_member(&member("bob", 1_000)).unwrap();
        let first = post("alice", "one");
        let second = post("bob", "two");
        fx.add_post(&first);
        fx.add_post(&second);

        let mut scheduler = fx.scheduler();
        scheduler.begin_pass();
        let a = scheduler.pay_post(&first, Timestamp::new(NOW)).await.unwrap();
        let b = scheduler.pay_post(&second, Timestamp::new(NOW)).await.unwrap();
        assert!(a.is_delivered() && b.is_delivered());

        // 500 of 1000 at full mana, then 500 of 990 after the first vote
        // drained 1% of the voter's mana.
        assert!((a.votes[0].vote_percentage - 50.0).abs() < 1e-9);
        let expected = 500.0 / 990.0 * 100.0;
        assert!((b.votes[0].vote_percentage - expected).abs() < 1e-9);
        assert_eq!(b.delivered_rshares, 500);
        assert_eq!(fx.balance("bob"), 500);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_balance() {
        let fx = Fixture::new(&[("pool-a", 5_000.0)]);
        fx.chain.swallow_votes(true);
        fx.store.put_member(&member("alice", 2_000)).unwrap();
        let p = post("alice", "hello");
        fx.add_post(&p);

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        assert_eq!(payout.state, DeliveryState::Failed);
        assert_eq!(payout.votes[0].outcome, Some(VoteOutcome::Failed { attempts: 5 }));
        assert_eq!(fx.balance("alice"), 2_000);
        assert!(!fx.store.get_post(&p.authorperm).unwrap().unwrap().voted);
    }

    #[tokio::test]
    async fn dry_run_plans_without_broadcasting() {
        let fx = Fixture::new(&[("a", 50.0), ("b", 40.0), ("c", 60.0)]);
        fx.store.put_member(&member("alice", 240)).unwrap();
        let p = post("alice", "hello");
        fx.add_post(&p);

        let payout = fx
            .scheduler()
            .with_dry_run(true)
            .pay_post(&p, Timestamp::new(NOW))
            .await
            .unwrap();
        assert_eq!(payout.votes.len(), 3);
        assert_eq!(fx.chain.broadcast_attempts(), 0);
        assert_eq!(fx.balance("alice"), 240);
    }

    #[tokio::test]
    async fn non_member_post_is_retired() {
        let fx = Fixture::new(&[("pool-a", 5_000.0)]);
        let p = post("stranger", "hello");
        fx.add_post(&p);

        let payout = fx.scheduler().pay_post(&p, Timestamp::new(NOW)).await.unwrap();
        assert_eq!(payout.skipped, Some(SkipReason::NotMember));
        assert!(fx.store.get_post(&p.authorperm).unwrap().unwrap().skip);
    }
}
