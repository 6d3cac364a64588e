//! Member state storage trait.

use crate::StoreError;
use sbi_types::{AccountName, MemberState, Timestamp};

/// A confirmed payout, applied through [`MemberStore::record_vote_delivery`].
#[derive(Clone, Debug, PartialEq)]
pub struct VoteDelivery {
    pub delivered_rshares: i64,
    pub voted_at: Timestamp,
}

pub trait MemberStore {
    fn get_member(&self, id: &AccountName) -> Result<Option<MemberState>, StoreError>;
    fn put_member(&self, member: &MemberState) -> Result<(), StoreError>;
    fn remove_member(&self, id: &AccountName) -> Result<(), StoreError>;
    fn all_members(&self) -> Result<Vec<MemberState>, StoreError>;

    fn put_members(&self, members: &[MemberState]) -> Result<(), StoreError> {
        for m in members {
            self.put_member(m)?;
        }
        Ok(())
    }

    /// The only path by which a vote payout touches member state: the
    /// balance is reduced by what was delivered and the cooldown restarts.
    fn record_vote_delivery(
        &self,
        id: &AccountName,
        delivery: &VoteDelivery,
    ) -> Result<MemberState, StoreError> {
        let mut member = self
            .get_member(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        member.balance_rshares -= delivery.delivered_rshares;
        member.rewarded_rshares += delivery.delivered_rshares;
        member.last_received_vote = Some(delivery.voted_at);
        self.put_member(&member)?;
        Ok(member)
    }

    /// Store a recalibrated vote delay (clamped by the member record).
    fn update_upvote_delay(&self, id: &AccountName, delay: f64) -> Result<(), StoreError> {
        let mut member = self
            .get_member(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        member.set_upvote_delay(delay);
        self.put_member(&member)
    }
}
