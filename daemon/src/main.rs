//! Reward service daemon: entry point for running the payout jobs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use sbi_chain::{DryRunBroadcaster, RpcChainClient, SignerServiceBroadcaster, VoteBroadcaster};
use sbi_runner::{BlacklistFile, RunnerConfig, Service, ShutdownSignal};
use sbi_store_lmdb::LmdbStore;
use sbi_utils::{init_logging, LogFormat, SystemClock};

#[derive(Parser)]
#[command(name = "sbi-daemon", about = "Basic-income reward service")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override
    /// its values.
    #[arg(long, env = "SBI_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "SBI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SBI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SBI_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Plan and log votes without broadcasting them.
    #[arg(long, env = "SBI_DRY_RUN")]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run every periodic job until interrupted.
    Run,
    /// Run the ledger cycle if one is due.
    Cycle,
    /// Resolve delegations into bonus shares.
    Delegations,
    /// Stream the next window of posts and comments.
    Stream,
    /// Run one upvote sweep.
    Upvote,
    /// Process the next window of votes (delay calibration, abuse scan).
    Watch,
    /// One-off maintenance jobs.
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceAction,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(clap::Subcommand)]
enum MaintenanceAction {
    /// Assign enrollments without sponsees to the longest-standing member.
    ReassignSponsees,
    /// Apply an external blacklist file.
    SyncBlacklist {
        #[arg(long)]
        file: PathBuf,
    },
    /// Report share and balance totals and inconsistent records.
    CheckMembers,
}

type DaemonService = Service<RpcChainClient, dyn VoteBroadcaster, LmdbStore, SystemClock>;

fn load_config(cli: &Cli) -> anyhow::Result<RunnerConfig> {
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.dry_run |= cli.dry_run;
    Ok(config)
}

fn build_service(config: RunnerConfig) -> anyhow::Result<DaemonService> {
    let store = LmdbStore::open(&config.data_dir)
        .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;
    let chain = RpcChainClient::new(
        config.nodes.clone(),
        config.chain_id.clone(),
        config.delivery.retry.clone(),
    )?;

    let broadcaster: Arc<dyn VoteBroadcaster> = if config.dry_run {
        Arc::new(DryRunBroadcaster)
    } else {
        let url = config
            .signer_url
            .clone()
            .context("signer_url must be set unless running with --dry-run")?;
        Arc::new(SignerServiceBroadcaster::new(url)?)
    };

    let service = Service::new(
        config,
        Arc::new(chain),
        broadcaster,
        Arc::new(store),
        Arc::new(SystemClock),
    )
    .context("invalid reward configuration")?;
    Ok(service)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    tracing::info!(
        data_dir = %config.data_dir.display(),
        nodes = config.nodes.len(),
        dry_run = config.dry_run,
        "starting reward service"
    );
    let service = build_service(config)?;

    match cli.command {
        Command::Run => {
            let shutdown = ShutdownSignal::new();
            let listener = shutdown.clone();
            tokio::spawn(async move { listener.wait_for_signal().await });
            service.run(shutdown).await?;
        }
        Command::Cycle => {
            if service.run_ledger_cycle().await?.is_none() {
                tracing::info!("ledger cycle not due");
            }
        }
        Command::Delegations => {
            service.run_delegation_check().await?;
        }
        Command::Stream => {
            if service.run_stream_posts().await?.is_none() {
                tracing::info!("post stream is at head");
            }
        }
        Command::Upvote => {
            service.run_upvote_sweep().await?;
        }
        Command::Watch => {
            if let Some(report) = service.run_vote_watch().await? {
                for flagged in &report.flagged {
                    tracing::warn!(
                        member = %flagged.authorperm.author,
                        service = %flagged.service,
                        trx_id = %flagged.trx_id,
                        "bought vote detected"
                    );
                }
            }
        }
        Command::Maintenance { action } => run_maintenance(&service, action)?,
        Command::Config => {}
    }
    Ok(())
}

fn run_maintenance(service: &DaemonService, action: MaintenanceAction) -> anyhow::Result<()> {
    match action {
        MaintenanceAction::ReassignSponsees => {
            let assigned = service.reassign_sponsees()?;
            tracing::info!(assigned = assigned.len(), "sponsee reassignment done");
        }
        MaintenanceAction::SyncBlacklist { file } => {
            let list = BlacklistFile::from_toml_file(&file.to_string_lossy())
                .with_context(|| format!("failed to read blacklist {}", file.display()))?;
            let changed = service.sync_blacklist(&list.entries)?;
            tracing::info!(listed = list.entries.len(), changed, "blacklist synced");
        }
        MaintenanceAction::CheckMembers => {
            let check = service.check_members()?;
            if !check.orphaned_events.is_empty() {
                tracing::warn!(events = ?check.orphaned_events, "enrollments without member rows");
            }
        }
    }
    Ok(())
}
