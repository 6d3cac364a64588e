//! Ledger events: the append-only record the member ledger is replayed from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::account::AccountName;
use crate::error::TypesError;
use crate::time::Timestamp;

/// What kind of entitlement change an event carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareType {
    /// Plain enrollment: a sponsor pays for shares for itself and its sponsees.
    Sponsorship,
    /// Stake delegated to the service account.
    Delegation,
    /// A delegation that was withdrawn (vests set to zero).
    RemovedDelegation,
    /// A delegation that is paid for by the service (excluded from bonus shares).
    DelegationLeased,
    /// Management share allocation marker.
    Mgmt,
    /// Management transfer marker (same effect as `Mgmt`).
    MgmtTransfer,
    /// Share transfer between members (not replayed).
    ShareTransfer,
}

impl ShareType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sponsorship => "Sponsorship",
            Self::Delegation => "Delegation",
            Self::RemovedDelegation => "RemovedDelegation",
            Self::DelegationLeased => "DelegationLeased",
            Self::Mgmt => "Mgmt",
            Self::MgmtTransfer => "MgmtTransfer",
            Self::ShareTransfer => "ShareTransfer",
        }
    }

    /// Delegation-family events are resolved by the delegation resolver,
    /// not replayed into shares.
    pub fn is_delegation(&self) -> bool {
        matches!(
            self,
            Self::Delegation | Self::RemovedDelegation | Self::DelegationLeased
        )
    }

    pub fn is_management(&self) -> bool {
        matches!(self, Self::Mgmt | Self::MgmtTransfer)
    }
}

impl fmt::Display for ShareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sponsorship" | "Standard" => Ok(Self::Sponsorship),
            "Delegation" => Ok(Self::Delegation),
            "RemovedDelegation" => Ok(Self::RemovedDelegation),
            "DelegationLeased" => Ok(Self::DelegationLeased),
            "Mgmt" => Ok(Self::Mgmt),
            "MgmtTransfer" => Ok(Self::MgmtTransfer),
            "ShareTransfer" => Ok(Self::ShareTransfer),
            other => Err(TypesError::UnknownShareType(other.to_string())),
        }
    }
}

/// Processing status assigned when the transfer memo was parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Valid,
    /// Fewer sponsees named in the memo than shares paid for.
    LessOrNoSponsee,
    /// Memo was encrypted and could not be read at parse time.
    EncryptedMemo,
    Invalid,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::LessOrNoSponsee => "LessOrNoSponsee",
            Self::EncryptedMemo => "EncryptedMemo",
            Self::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(Self::Valid),
            "LessOrNoSponsee" => Ok(Self::LessOrNoSponsee),
            "EncryptedMemo" => Ok(Self::EncryptedMemo),
            "Invalid" => Ok(Self::Invalid),
            other => Err(TypesError::UnknownStatus(other.to_string())),
        }
    }
}

/// An immutable ledger record. `event_id` is the position in the stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: u64,
    pub share_type: ShareType,
    pub status: EventStatus,
    /// Account that sent the transfer or delegation.
    pub account: AccountName,
    /// Account credited with `shares`.
    pub sponsor: AccountName,
    /// Raw JSON object `{"account": shares, ...}` as stored by the memo parser.
    pub sponsee: String,
    pub shares: u64,
    /// Delegated vests, only meaningful for delegation-family events.
    pub vests: f64,
    #[serde(default)]
    pub memo: String,
    pub timestamp: Timestamp,
}

impl LedgerEvent {
    /// Decode the sponsee map. An empty payload is an empty map.
    pub fn sponsee_map(&self) -> Result<BTreeMap<AccountName, u64>, TypesError> {
        if self.sponsee.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let raw: BTreeMap<String, u64> =
            serde_json::from_str(&self.sponsee).map_err(|e| TypesError::MalformedSponsee {
                event_id: self.event_id,
                reason: e.to_string(),
            })?;
        Ok(raw
            .into_iter()
            .map(|(account, shares)| (AccountName::new(account), shares))
            .collect())
    }

    /// Total shares named in the sponsee map, or 0 if it does not decode.
    pub fn sponsee_total(&self) -> u64 {
        self.sponsee_map()
            .map(|m| m.values().sum())
            .unwrap_or(0)
    }

    /// Encode a sponsee map back into the stored JSON form.
    pub fn encode_sponsee(map: &BTreeMap<AccountName, u64>) -> String {
        let raw: BTreeMap<&str, u64> = map.iter().map(|(a, s)| (a.as_str(), *s)).collect();
        serde_json::to_string(&raw).unwrap_or_else(|_| "{}".to_string())
    }
}
