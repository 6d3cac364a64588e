//! Member ledger for the reward service.
//!
//! Member state is never patched incrementally. Every cycle the event log is
//! replayed from scratch into fresh share counts, delegations are resolved
//! into bonus shares, share-age is integrated, and only then is the cycle's
//! accrual credited to each member's balance.

pub mod accrual;
pub mod cycle;
pub mod delegation;
pub mod error;
pub mod rebuild;
pub mod share_age;

pub use accrual::{accrue, accrue_all, credit_curation, credit_other, AccrualReport};
pub use cycle::{CycleDecision, CycleGate};
pub use delegation::{DelegationResolution, DelegationResolver, LeaseTransition};
pub use error::LedgerError;
pub use rebuild::{MemberLedger, RebuildReport, SkippedEvent};
pub use share_age::{calc_share_age, calc_share_age_until, refresh_share_age};
