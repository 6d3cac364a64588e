//! JSON-RPC chain client with node rotation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use sbi_crypto::CompactSignature;
use sbi_types::{AccountName, ActiveVote, Authorperm, Timestamp, VoterCapacity};

use crate::client::ChainClient;
use crate::mana::Manabar;
use crate::parse::{num_field, parse_asset, parse_json_metadata, parse_time, str_field};
use crate::types::{Block, ChainAccount, ChainOp, Content, SignedTransaction};
use crate::{ChainError, RetryPolicy};

/// Raw mana units per vest.
const MANA_PER_VEST: f64 = 1_000_000.0;

/// Chain client backed by a list of public API nodes.
///
/// Every call is retried on transient errors, moving to the next node
/// between attempts.
pub struct RpcChainClient {
    http: reqwest::Client,
    nodes: Vec<String>,
    current: AtomicUsize,
    chain_id: String,
    key_prefix: String,
    retry: RetryPolicy,
}

impl RpcChainClient {
    pub fn new(
        nodes: Vec<String>,
        chain_id: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, ChainError> {
        if nodes.is_empty() {
            return Err(ChainError::Transport("no RPC nodes configured".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            nodes,
            current: AtomicUsize::new(0),
            chain_id: chain_id.into(),
            key_prefix: sbi_crypto::DEFAULT_KEY_PREFIX.to_string(),
            retry,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn current_node(&self) -> &str {
        let idx = self.current.load(Ordering::Relaxed) % self.nodes.len();
        &self.nodes[idx]
    }

    async fn call_once(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response = self.http.post(self.current_node()).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let mut payload: Value = response.json().await?;
        if let Some(err) = payload.get("error") {
            return Err(ChainError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        payload
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| ChainError::Decode(format!("{method}: response without result")))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        self.retry
            .run(
                || self.rotate_node(),
                || self.call_once(method, params.clone()),
            )
            .await
    }

    async fn global_properties(&self) -> Result<Value, ChainError> {
        self.call("condenser_api.get_dynamic_global_properties", json!([]))
            .await
    }

    async fn account_json(&self, id: &AccountName) -> Result<Option<Value>, ChainError> {
        let result = self
            .call("condenser_api.get_accounts", json!([[id.as_str()]]))
            .await?;
        Ok(result.as_array().and_then(|a| a.first()).cloned())
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn rotate_node(&self) {
        let next = (self.current.fetch_add(1, Ordering::Relaxed) + 1) % self.nodes.len();
        tracing::info!(node = %self.nodes[next], "switching RPC node");
    }

    async fn head_block(&self) -> Result<(u64, Timestamp), ChainError> {
        let props = self.global_properties().await?;
        let head = num_field(&props, "head_block_number")? as u64;
        let time = parse_time(str_field(&props, "time")?)?;
        Ok((head, time))
    }

    async fn get_account(&self, id: &AccountName) -> Result<Option<ChainAccount>, ChainError> {
        let Some(account) = self.account_json(id).await? else {
            return Ok(None);
        };
        Ok(Some(ChainAccount {
            name: AccountName::new(str_field(&account, "name")?),
            created: parse_time(str_field(&account, "created")?)?,
            post_count: num_field(&account, "post_count").unwrap_or(0.0) as u64,
        }))
    }

    async fn get_capacity(&self, account: &AccountName) -> Result<VoterCapacity, ChainError> {
        let json = self
            .account_json(account)
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("account {account}")))?;
        let (_, now) = self.head_block().await?;
        Ok(manabar_from_account(&json)?.to_capacity(account.clone(), now))
    }

    async fn get_content(&self, authorperm: &Authorperm) -> Result<Content, ChainError> {
        let result = self
            .call(
                "condenser_api.get_content",
                json!([authorperm.author.as_str(), authorperm.permlink]),
            )
            .await?;
        content_from_json(authorperm, &result)
    }

    async fn get_votes(&self, authorperm: &Authorperm) -> Result<Vec<ActiveVote>, ChainError> {
        let result = self
            .call(
                "condenser_api.get_active_votes",
                json!([authorperm.author.as_str(), authorperm.permlink]),
            )
            .await?;
        active_votes_from_json(&result)
    }

    async fn get_block(&self, block_num: u64) -> Result<Option<Block>, ChainError> {
        let result = self.call("condenser_api.get_block", json!([block_num])).await?;
        if result.is_null() {
            return Ok(None);
        }
        block_from_json(block_num, &result).map(Some)
    }

    async fn transaction_bytes(&self, tx: &SignedTransaction) -> Result<Vec<u8>, ChainError> {
        let result = self
            .call("condenser_api.get_transaction_hex", json!([tx.raw]))
            .await?;
        let hex_tx = result
            .as_str()
            .ok_or_else(|| ChainError::Decode("transaction hex is not a string".into()))?;
        hex::decode(hex_tx).map_err(|e| ChainError::Decode(format!("transaction hex: {e}")))
    }

    async fn accounts_for_keys(&self, keys: &[String]) -> Result<Vec<AccountName>, ChainError> {
        let result = self
            .call("condenser_api.get_key_references", json!([keys]))
            .await?;
        let mut accounts: Vec<AccountName> = result
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .map(AccountName::new)
            .collect();
        accounts.sort();
        accounts.dedup();
        Ok(accounts)
    }

    async fn vests_to_native(&self, vests: f64) -> Result<f64, ChainError> {
        let props = self.global_properties().await?;
        let (fund, _) = parse_asset(str_field(&props, "total_vesting_fund_hive")?)?;
        let (shares, _) = parse_asset(str_field(&props, "total_vesting_shares")?)?;
        if shares <= 0.0 {
            return Err(ChainError::Decode("total_vesting_shares is zero".into()));
        }
        Ok(vests * fund / shares)
    }

    async fn rshares_to_fiat(&self, rshares: f64) -> Result<f64, ChainError> {
        let fund = self.call("condenser_api.get_reward_fund", json!(["post"])).await?;
        let (reward_balance, _) = parse_asset(str_field(&fund, "reward_balance")?)?;
        let recent_claims = num_field(&fund, "recent_claims")?;

        let price = self
            .call("condenser_api.get_current_median_history_price", json!([]))
            .await?;
        let (base, _) = parse_asset(str_field(&price, "base")?)?;
        let (quote, _) = parse_asset(str_field(&price, "quote")?)?;

        if recent_claims <= 0.0 || quote <= 0.0 {
            return Err(ChainError::Decode("reward fund or price is zero".into()));
        }
        Ok(rshares * reward_balance / recent_claims * base / quote)
    }
}

pub(crate) fn manabar_from_account(account: &Value) -> Result<Manabar, ChainError> {
    let (own, _) = parse_asset(str_field(account, "vesting_shares")?)?;
    let (delegated, _) = parse_asset(str_field(account, "delegated_vesting_shares")?)?;
    let (received, _) = parse_asset(str_field(account, "received_vesting_shares")?)?;
    let max_mana = ((own - delegated + received) * MANA_PER_VEST).max(0.0);

    let bar = account
        .get("voting_manabar")
        .ok_or_else(|| ChainError::Decode("missing field 'voting_manabar'".into()))?;
    Ok(Manabar {
        max_mana,
        current_mana: num_field(bar, "current_mana")?,
        last_update_time: Timestamp::new(num_field(bar, "last_update_time")? as u64),
    })
}

pub(crate) fn active_votes_from_json(value: &Value) -> Result<Vec<ActiveVote>, ChainError> {
    let votes = value
        .as_array()
        .ok_or_else(|| ChainError::Decode("active votes is not an array".into()))?;
    votes
        .iter()
        .map(|v| {
            Ok(ActiveVote {
                voter: AccountName::new(str_field(v, "voter")?),
                rshares: num_field(v, "rshares")? as i64,
                weight: num_field(v, "weight").unwrap_or(0.0).max(0.0) as u64,
                percent: num_field(v, "percent").unwrap_or(0.0) as i64,
                time: parse_time(str_field(v, "time")?)?,
            })
        })
        .collect()
}

pub(crate) fn content_from_json(authorperm: &Authorperm, value: &Value) -> Result<Content, ChainError> {
    let author = value.get("author").and_then(Value::as_str).unwrap_or("");
    if author.is_empty() {
        return Err(ChainError::NotFound(format!("content {authorperm}")));
    }
    let (tags, app) = parse_json_metadata(value.get("json_metadata").and_then(Value::as_str).unwrap_or(""));
    let pending = value
        .get("pending_payout_value")
        .and_then(Value::as_str)
        .map(parse_asset)
        .transpose()?
        .map(|(amount, _)| amount)
        .unwrap_or(0.0);
    Ok(Content {
        authorperm: authorperm.clone(),
        created: parse_time(str_field(value, "created")?)?,
        parent_author: value
            .get("parent_author")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        tags,
        app,
        body: value.get("body").and_then(Value::as_str).unwrap_or("").to_string(),
        pending_payout_value: pending,
        total_vote_weight: num_field(value, "total_vote_weight").unwrap_or(0.0).max(0.0) as u64,
        active_votes: match value.get("active_votes") {
            Some(votes) => active_votes_from_json(votes)?,
            None => Vec::new(),
        },
    })
}

fn op_from_json(op: &Value) -> Result<ChainOp, ChainError> {
    let pair = op
        .as_array()
        .filter(|p| p.len() == 2)
        .ok_or_else(|| ChainError::Decode("operation is not a [type, body] pair".into()))?;
    let kind = pair[0]
        .as_str()
        .ok_or_else(|| ChainError::Decode("operation type is not a string".into()))?;
    let body = &pair[1];
    Ok(match kind {
        "comment" => ChainOp::Comment {
            author: AccountName::new(str_field(body, "author")?),
            permlink: str_field(body, "permlink")?.to_string(),
            parent_author: str_field(body, "parent_author")?.to_string(),
            body: body.get("body").and_then(Value::as_str).unwrap_or("").to_string(),
            json_metadata: body
                .get("json_metadata")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        },
        "vote" => ChainOp::Vote {
            voter: AccountName::new(str_field(body, "voter")?),
            author: AccountName::new(str_field(body, "author")?),
            permlink: str_field(body, "permlink")?.to_string(),
            weight: num_field(body, "weight")? as i64,
        },
        "transfer" => {
            let (amount, symbol) = parse_asset(str_field(body, "amount")?)?;
            ChainOp::Transfer {
                from: AccountName::new(str_field(body, "from")?),
                to: AccountName::new(str_field(body, "to")?),
                amount,
                symbol,
                memo: body.get("memo").and_then(Value::as_str).unwrap_or("").to_string(),
            }
        }
        other => ChainOp::Other(other.to_string()),
    })
}

pub(crate) fn block_from_json(block_num: u64, value: &Value) -> Result<Block, ChainError> {
    let timestamp = parse_time(str_field(value, "timestamp")?)?;
    let ids: Vec<&str> = value
        .get("transaction_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut transactions = Vec::new();
    let raw_txs = value
        .get("transactions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for (i, raw) in raw_txs.into_iter().enumerate() {
        let operations = raw
            .get("operations")
            .and_then(Value::as_array)
            .map(|ops| ops.iter().map(op_from_json).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();
        let signatures = raw
            .get("signatures")
            .and_then(Value::as_array)
            .map(|sigs| {
                sigs.iter()
                    .filter_map(Value::as_str)
                    .map(CompactSignature::from_hex)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        transactions.push(SignedTransaction {
            trx_id: ids.get(i).map(|s| s.to_string()).unwrap_or_default(),
            operations,
            signatures,
            raw,
        });
    }

    Ok(Block {
        block_num,
        timestamp,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_node_list() {
        assert!(RpcChainClient::new(vec![], "00", RetryPolicy::default()).is_err());
    }

    #[test]
    fn rotation_wraps_around() {
        let client = RpcChainClient::new(
            vec!["https://a".into(), "https://b".into()],
            "00",
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(client.current_node(), "https://a");
        client.rotate_node();
        assert_eq!(client.current_node(), "https://b");
        client.rotate_node();
        assert_eq!(client.current_node(), "https://a");
    }

    #[test]
    fn decodes_manabar() {
        let account = json!({
            "vesting_shares": "100.000000 VESTS",
            "delegated_vesting_shares": "20.000000 VESTS",
            "received_vesting_shares": "10.000000 VESTS",
            "voting_manabar": {"current_mana": "45000000", "last_update_time": 1000}
        });
        let bar = manabar_from_account(&account).unwrap();
        assert_eq!(bar.max_mana, 90_000_000.0);
        assert_eq!(bar.current_mana, 45_000_000.0);
        assert_eq!(bar.last_update_time, Timestamp::new(1000));
    }

    #[test]
    fn decodes_content_and_votes() {
        let value = json!({
            "author": "alice",
            "permlink": "hello",
            "parent_author": "",
            "created": "2024-01-01T00:00:00",
            "json_metadata": "{\"tags\":[\"sbi\"],\"app\":\"peakd\"}",
            "body": "hi",
            "pending_payout_value": "2.500 HBD",
            "total_vote_weight": 300,
            "active_votes": [
                {"voter": "bob", "rshares": "1000", "weight": 200, "percent": 10000, "time": "2024-01-01T00:05:00"}
            ]
        });
        let content = content_from_json(&Authorperm::new("alice", "hello"), &value).unwrap();
        assert!(content.is_main_post());
        assert_eq!(content.tags, vec!["sbi"]);
        assert_eq!(content.pending_payout_value, 2.5);
        assert_eq!(content.active_votes[0].rshares, 1000);
        assert_eq!(content.active_votes[0].weight, 200);
    }

    #[test]
    fn missing_content_is_not_found() {
        let value = json!({"author": "", "permlink": ""});
        assert!(matches!(
            content_from_json(&Authorperm::new("a", "b"), &value),
            Err(ChainError::NotFound(_))
        ));
    }

    #[test]
    fn decodes_block_operations() {
        let value = json!({
            "timestamp": "2024-01-01T00:00:03",
            "transaction_ids": ["abc"],
            "transactions": [{
                "operations": [
                    ["vote", {"voter": "bob", "author": "alice", "permlink": "hello", "weight": 10000}],
                    ["custom_json", {}]
                ],
                "signatures": []
            }]
        });
        let block = block_from_json(7, &value).unwrap();
        assert_eq!(block.transactions[0].trx_id, "abc");
        let votes = block.ops(&["vote"]);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].block_num, 7);
        assert!(matches!(block.ops(&[]).last().unwrap().op, ChainOp::Other(ref k) if k == "custom_json"));
    }
}
