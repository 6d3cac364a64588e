//! Resolved delegation state per delegator.

use serde::{Deserialize, Serialize};

use crate::account::AccountName;
use crate::time::Timestamp;

/// The latest known delegation from one account to the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub account: AccountName,
    pub vests: f64,
    /// Paid-for delegations contribute no bonus shares.
    pub is_leased: bool,
    /// Set when the latest event withdrew the delegation.
    pub removed: bool,
    pub bonus_shares: i64,
    pub observed_at: Timestamp,
}
