//! Post streaming: records member posts and comments as pending payouts.

use std::collections::{BTreeMap, BTreeSet};

use sbi_chain::parse::parse_json_metadata;
use sbi_chain::{ChainClient, ChainError, ChainOp, VoteBroadcaster};
use sbi_store::ServiceStore;
use sbi_types::time::SECS_PER_DAY;
use sbi_types::{AccountName, Authorperm, MemberState, PendingPost, RewardParams, Timestamp};
use sbi_utils::Clock;

use crate::{RunnerError, Service};

/// Comments become payable once the member's last root post is this old.
pub const COMMENT_ELIGIBILITY_SECS: u64 = 7 * SECS_PER_DAY;
/// Pending posts older than this are dropped.
pub const PENDING_POST_RETENTION_SECS: u64 = SECS_PER_DAY;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamReport {
    pub start: u64,
    pub stop: u64,
    pub posts: usize,
    pub comments: usize,
    pub filtered: usize,
    pub pruned: usize,
}

/// Set `comment_upvote` from how long ago the member last posted.
pub fn refresh_comment_eligibility(member: &mut MemberState, now: Timestamp) {
    member.comment_upvote = member
        .last_post
        .map_or(true, |t| t.elapsed_since(now) > COMMENT_ELIGIBILITY_SECS);
}

/// Whether a post matches one of the tag, app or body blocklists.
pub fn matches_post_filters(params: &RewardParams, json_metadata: &str, body: &str) -> bool {
    let (tags, app) = parse_json_metadata(json_metadata);
    if tags
        .iter()
        .any(|t| params.blacklist_tags.iter().any(|b| b.eq_ignore_ascii_case(t)))
    {
        return true;
    }
    if let Some(app) = app {
        // "peakd/2024.1" names the app "peakd".
        let name = app.split('/').next().unwrap_or_default();
        if params.blacklist_apps.iter().any(|b| b.eq_ignore_ascii_case(name)) {
            return true;
        }
    }
    params
        .blacklist_body
        .iter()
        .any(|fragment| !fragment.is_empty() && body.contains(fragment.as_str()))
}

impl<C, B, S, K> Service<C, B, S, K>
where
    C: ChainClient + ?Sized,
    B: VoteBroadcaster + ?Sized,
    S: ServiceStore,
    K: Clock,
{
    /// Read the next window of `comment` operations and record member
    /// content. Returns `None` when the stream is already at head.
    pub async fn run_stream_posts(&self) -> Result<Option<StreamReport>, RunnerError> {
        let now = self.clock.now();
        let mut state = self.store.get_cycle_state()?;
        let head = self.chain.head_block_num().await?;
        let start = state
            .last_streamed_block
            .map(|b| b + 1)
            .unwrap_or_else(|| head.saturating_sub(self.config.stream.lookback_blocks));
        if start > head {
            return Ok(None);
        }
        let stop = head.min(start + self.config.stream.batch_blocks.max(1) - 1);

        let ops = self.chain.stream_ops(start, stop, &["comment"]).await?;
        let mut members: BTreeMap<AccountName, MemberState> = self
            .store
            .all_members()?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        let mut touched = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut posts = Vec::new();
        let mut report = StreamReport {
            start,
            stop,
            ..Default::default()
        };

        for op in ops {
            let ChainOp::Comment {
                author,
                permlink,
                parent_author,
                body,
                json_metadata,
            } = op.op
            else {
                continue;
            };
            let Some(member) = members.get_mut(&author) else {
                continue;
            };
            let authorperm = Authorperm::new(author.clone(), permlink);
            if seen.contains(&authorperm) || self.store.get_post(&authorperm)?.is_some() {
                continue;
            }
            seen.insert(authorperm.clone());

            // Edits carry the edit time; the chain knows the real one.
            let created = match self.chain.get_content(&authorperm).await {
                Ok(content) => content.created,
                Err(ChainError::NotFound(_)) => op.timestamp,
                Err(e) => return Err(e.into()),
            };
            if created.elapsed_since(now) > PENDING_POST_RETENTION_SECS {
                tracing::debug!(post = %authorperm, "edit of an old post, ignored");
                continue;
            }

            let main_post = parent_author.is_empty();
            if main_post {
                member.last_post = Some(created);
                report.posts += 1;
            } else {
                member.last_comment = Some(created);
                report.comments += 1;
            }
            refresh_comment_eligibility(member, created);
            touched.insert(author.clone());

            let skip = matches_post_filters(&self.params, &json_metadata, &body);
            if skip {
                report.filtered += 1;
                tracing::info!(post = %authorperm, "post matches a blocklist, not paid");
            }
            posts.push(PendingPost {
                authorperm,
                author,
                created,
                block: op.block_num,
                main_post,
                voted: false,
                skip,
                stale: false,
                vote_delay: member.upvote_delay,
                voted_after: None,
            });
        }

        // Nothing is written until every op in the window has been read, so
        // a failed window is replayed in full with the member rows.
        for post in &posts {
            self.store.put_post(post)?;
        }
        for id in &touched {
            if let Some(member) = members.get(id) {
                self.store.put_member(member)?;
            }
        }
        report.pruned = self
            .store
            .delete_posts_before(now.minus_secs(PENDING_POST_RETENTION_SECS))?;

        state.last_streamed_block = Some(stop);
        self.store.put_cycle_state(&state)?;

        tracing::info!(
            start,
            stop,
            posts = report.posts,
            comments = report.comments,
            filtered = report.filtered,
            pruned = report.pruned,
            "post stream window processed"
        );
        Ok(Some(report))
    }
}
