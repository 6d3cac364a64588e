//! Vote broadcasters.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use sbi_types::{AccountName, Authorperm};

use crate::client::VoteBroadcaster;
use crate::ChainError;

/// Full vote weight on chain (100%).
const FULL_WEIGHT: f64 = 10_000.0;

#[derive(Debug, Serialize, PartialEq)]
struct VoteRequest<'a> {
    voter: &'a str,
    author: &'a str,
    permlink: &'a str,
    weight: i64,
}

/// Chain weight for a percentage, clamped to a full upvote.
pub fn vote_weight(percentage: f64) -> i64 {
    (percentage.clamp(0.0, 100.0) * FULL_WEIGHT / 100.0).round() as i64
}

/// Hands votes to an external signing service that holds the posting keys.
pub struct SignerServiceBroadcaster {
    http: reqwest::Client,
    url: String,
}

impl SignerServiceBroadcaster {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl VoteBroadcaster for SignerServiceBroadcaster {
    async fn broadcast_vote(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> Result<(), ChainError> {
        let request = VoteRequest {
            voter: voter.as_str(),
            author: authorperm.author.as_str(),
            permlink: &authorperm.permlink,
            weight: vote_weight(percentage),
        };
        let response = self.http.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Broadcast(format!("signer returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Logs votes instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunBroadcaster;

#[async_trait]
impl VoteBroadcaster for DryRunBroadcaster {
    async fn broadcast_vote(
        &self,
        voter: &AccountName,
        authorperm: &Authorperm,
        percentage: f64,
    ) -> Result<(), ChainError> {
        tracing::info!(
            voter = %voter,
            authorperm = %authorperm,
            weight = vote_weight(percentage),
            "dry run: vote not broadcast"
        );
        Ok(())
    }
}
