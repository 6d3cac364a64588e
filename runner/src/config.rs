//! Runner configuration with TOML file support.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use sbi_abuse::AbuseConfig;
use sbi_types::{AccountName, RewardParams};
use sbi_utils::LogFormat;
use sbi_voting::DeliveryConfig;

use crate::RunnerError;

/// Configuration for the reward service.
///
/// Loaded from a TOML file via [`RunnerConfig::from_toml_file`] or built
/// programmatically for tests. The `[params]` table only seeds the store
/// on first run; afterwards the persisted parameters win.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// RPC nodes, tried in order and rotated on failure.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Hex chain id used for transaction digests.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// The service's voter accounts, in preference order.
    #[serde(default)]
    pub voter_accounts: Vec<AccountName>,

    /// Account that receives enrollments and pays for leased delegations.
    #[serde(default = "default_service_account")]
    pub service_account: AccountName,

    /// Fixed share allocation applied at the management marker event.
    #[serde(default)]
    pub management_allocation: BTreeMap<String, u64>,

    /// Endpoint of the signer service that holds the voting keys.
    #[serde(default)]
    pub signer_url: Option<String>,

    /// Plan and log votes without broadcasting them.
    #[serde(default)]
    pub dry_run: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter (e.g. "info", "debug", "sbi_voting=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub abuse: AbuseConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub schedule: JobSchedule,

    /// Seeds the persisted reward parameters.
    #[serde(default)]
    pub params: RewardParams,
}

/// Block windows read by the post stream and the vote watcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// How far behind head to start when nothing was streamed yet.
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
    /// Most blocks read in one job run.
    #[serde(default = "default_batch_blocks")]
    pub batch_blocks: u64,
    /// The vote watcher stays this far behind head so that competing
    /// curators have voted before performance is compared.
    #[serde(default = "default_watch_delay_blocks")]
    pub watch_delay_blocks: u64,
}

/// Seconds between runs of each job in the long-running loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSchedule {
    #[serde(default = "default_cycle_check_secs")]
    pub cycle_check_secs: u64,
    #[serde(default = "default_stream_secs")]
    pub stream_secs: u64,
    #[serde(default = "default_upvote_secs")]
    pub upvote_secs: u64,
    #[serde(default = "default_watch_secs")]
    pub watch_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_nodes() -> Vec<String> {
    vec!["https://api.hive.blog".to_string()]
}

fn default_chain_id() -> String {
    "beeab0de00000000000000000000000000000000000000000000000000000000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./sbi_data")
}

fn default_service_account() -> AccountName {
    AccountName::new("steembasicincome")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lookback_blocks() -> u64 {
    28_800
}

fn default_batch_blocks() -> u64 {
    6_000
}

fn default_watch_delay_blocks() -> u64 {
    1_200
}

fn default_cycle_check_secs() -> u64 {
    300
}

fn default_stream_secs() -> u64 {
    60
}

fn default_upvote_secs() -> u64 {
    60
}

fn default_watch_secs() -> u64 {
    600
}

// ── Impl ───────────────────────────────────────────────────────────────

impl RunnerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, RunnerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RunnerError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RunnerError> {
        toml::from_str(s).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RunnerError> {
        toml::to_string_pretty(self).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Management allocation keyed by account.
    pub fn management_allocation(&self) -> BTreeMap<AccountName, u64> {
        self.management_allocation
            .iter()
            .map(|(name, shares)| (AccountName::new(name.as_str()), *shares))
            .collect()
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            chain_id: default_chain_id(),
            data_dir: default_data_dir(),
            voter_accounts: Vec::new(),
            service_account: default_service_account(),
            management_allocation: BTreeMap::new(),
            signer_url: None,
            dry_run: false,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            delivery: DeliveryConfig::default(),
            abuse: AbuseConfig::default(),
            stream: StreamConfig::default(),
            schedule: JobSchedule::default(),
            params: RewardParams::default(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: default_lookback_blocks(),
            batch_blocks: default_batch_blocks(),
            watch_delay_blocks: default_watch_delay_blocks(),
        }
    }
}

impl Default for JobSchedule {
    fn default() -> Self {
        Self {
            cycle_check_secs: default_cycle_check_secs(),
            stream_secs: default_stream_secs(),
            upvote_secs: default_upvote_secs(),
            watch_secs: default_watch_secs(),
        }
    }
}
