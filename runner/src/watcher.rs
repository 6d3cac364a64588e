//! Vote-history watcher.
//!
//! Follows `vote` operations a fixed distance behind head. Pool votes on
//! member content feed the delay calibrator; large votes from anyone else
//! are traced by the abuse detector.

use std::collections::{BTreeMap, BTreeSet};

use sbi_abuse::{AbuseDetector, FlaggedService};
use sbi_chain::types::Content;
use sbi_chain::{ChainClient, ChainError, ChainOp, VoteBroadcaster};
use sbi_store::ServiceStore;
use sbi_types::{AccountName, Authorperm, CurationSample, Timestamp};
use sbi_utils::Clock;
use sbi_voting::{analyze_votes, recalibrate};

use crate::{RunnerError, Service};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WatchReport {
    pub start: u64,
    pub stop: u64,
    pub posts: usize,
    pub calibrated: usize,
    pub flagged: Vec<FlaggedService>,
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Process the next window of votes. Returns `None` when the watcher
    /// has caught up with its lag behind head.
    pub async fn run_vote_watch(&self) -> Result<Option<WatchReport>, RunnerError> {
        let now = self.clock.now();
        let mut state = self.store.get_cycle_state()?;
        let head = self.chain.head_block_num().await?;
        let tip = head.saturating_sub(self.config.stream.watch_delay_blocks);
        let start = state
            .last_scanned_vote_block
            .map(|b| b + 1)
            .unwrap_or_else(|| tip.saturating_sub(self.config.stream.lookback_blocks));
        if start > tip {
            return Ok(None);
        }
        let stop = tip.min(start + self.config.stream.batch_blocks.max(1) - 1);

        let members: BTreeSet<AccountName> = self
            .store
            .all_members()?
            .into_iter()
            .map(|m| m.id)
            .collect();

        // Voters seen in the window, per member post.
        let mut voters: BTreeMap<Authorperm, BTreeSet<AccountName>> = BTreeMap::new();
        for op in self.chain.stream_ops(start, stop, &["vote"]).await? {
            if let ChainOp::Vote {
                voter,
                author,
                permlink,
                ..
            } = op.op
            {
                if members.contains(&author) {
                    voters
                        .entry(Authorperm::new(author, permlink))
                        .or_default()
                        .insert(voter);
                }
            }
        }

        let detector = AbuseDetector::new(
            self.chain.as_ref(),
            &self.params.vote_selling_services,
            self.config.abuse.clone(),
        );
        let fiat_per_rshare = self.chain.rshares_to_fiat(1.0).await?;
        let mut report = WatchReport {
            start,
            stop,
            posts: voters.len(),
            ..Default::default()
        };

        for (authorperm, seen) in &voters {
            let content = match self.chain.get_content(authorperm).await {
                Ok(content) => content,
                Err(ChainError::NotFound(_)) => continue,
                Err(e) => {
                    tracing::warn!(post = %authorperm, error = %e, "could not read post, skipped");
                    continue;
                }
            };

            if self.calibrate(&content, seen, fiat_per_rshare, now)?.is_some() {
                report.calibrated += 1;
            }

            for vote in content
                .active_votes
                .iter()
                .filter(|v| seen.contains(&v.voter) && !self.pool.contains(&v.voter))
            {
                let flagged = detector
                    .check_vote(self.store.as_ref(), authorperm, vote, now)
                    .await;
                report.flagged.extend(flagged);
            }
        }

        state.last_scanned_vote_block = Some(stop);
        self.store.put_cycle_state(&state)?;

        tracing::info!(
            start,
            stop,
            posts = report.posts,
            calibrated = report.calibrated,
            flagged = report.flagged.len(),
            "vote window processed"
        );
        Ok(Some(report))
    }

    /// Compare the largest pool vote among `seen` on `content` with the
    /// other curators and move the author's vote delay. Records a curation
    /// sample when the post carries such a vote.
    fn calibrate(
        &self,
        content: &Content,
        seen: &BTreeSet<AccountName>,
        fiat_per_rshare: f64,
        now: Timestamp,
    ) -> Result<Option<CurationSample>, RunnerError> {
        let Some(pool_vote) = content
            .active_votes
            .iter()
            .filter(|v| seen.contains(&v.voter) && self.pool.contains(&v.voter))
            .max_by_key(|v| v.rshares)
        else {
            return Ok(None);
        };
        let author = &content.authorperm.author;
        let Some(member) = self.store.get_member(author)? else {
            return Ok(None);
        };
        let Some(analysis) =
            analyze_votes(content, &pool_vote.voter, |r| r as f64 * fiat_per_rshare)
        else {
            return Ok(None);
        };

        let best_delay = analysis.best_delay.unwrap_or(analysis.own_delay);
        let delay = recalibrate(
            &member,
            analysis.own_performance,
            analysis.best_performance,
            best_delay,
        );
        if delay != member.upvote_delay {
            self.store.update_upvote_delay(author, delay)?;
            tracing::info!(
                member = %author,
                from = member.upvote_delay,
                to = delay,
                own = analysis.own_performance,
                best = analysis.best_performance,
                "vote delay recalibrated"
            );
        }

        let sample = CurationSample {
            authorperm: content.authorperm.clone(),
            member: author.clone(),
            created: content.created,
            vote_rshares: analysis.own_rshares,
            vote_delay: analysis.own_delay,
            performance: analysis.own_performance,
            best_performance: analysis.best_performance,
            best_time_delay: best_delay,
            updated: now,
        };
        self.store.put_curation_sample(&sample)?;
        Ok(Some(sample))
    }
}
