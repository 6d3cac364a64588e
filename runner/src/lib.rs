//! Job orchestration for the reward service.
//!
//! A [`Service`] owns the chain client, vote broadcaster, store and clock,
//! and exposes every job as a method:
//! - ledger cycle (replay, delegation bonus, share-age, accrual)
//! - delegation check
//! - post stream
//! - upvote sweep
//! - vote watcher (delay calibration and abuse scan)
//! - maintenance: sponsee reassignment, blacklist sync, member check
//!
//! [`Service::run`] drives the periodic jobs until shut down.

pub mod config;
pub mod cycle;
pub mod delegations;
pub mod error;
pub mod maintenance;
pub mod service;
pub mod shutdown;
pub mod stream;
pub mod sweep;
pub mod watcher;

pub use config::{JobSchedule, RunnerConfig, StreamConfig};
pub use cycle::CycleReport;
pub use delegations::DelegationReport;
pub use error::RunnerError;
pub use maintenance::{BlacklistEntry, BlacklistFile, MemberCheck, SponseeAssignment};
pub use service::{load_params, Service};
pub use shutdown::ShutdownSignal;
pub use stream::{matches_post_filters, refresh_comment_eligibility, StreamReport};
pub use sweep::SweepReport;
pub use watcher::WatchReport;
