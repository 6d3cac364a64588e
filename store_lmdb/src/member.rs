//! LMDB implementation of MemberStore.

use sbi_store::{MemberStore, StoreError};
use sbi_types::{AccountName, MemberState};

use crate::LmdbStore;

impl MemberStore for LmdbStore {
    fn get_member(&self, id: &AccountName) -> Result<Option<MemberState>, StoreError> {
        Ok(self.get_row(self.members_db, id.as_str().as_bytes())?)
    }

    fn put_member(&self, member: &MemberState) -> Result<(), StoreError> {
        self.put_row(self.members_db, member.id.as_str().as_bytes(), member)?;
        Ok(())
    }

    fn remove_member(&self, id: &AccountName) -> Result<(), StoreError> {
        self.delete_row(self.members_db, id.as_str().as_bytes())?;
        Ok(())
    }

    fn all_members(&self) -> Result<Vec<MemberState>, StoreError> {
        Ok(self.scan(self.members_db)?)
    }

    fn put_members(&self, members: &[MemberState]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(crate::LmdbError::from)?;
        for m in members {
            let bytes = bincode::serialize(m).map_err(crate::LmdbError::from)?;
            self.members_db
                .put(&mut wtxn, m.id.as_str().as_bytes(), &bytes)
                .map_err(crate::LmdbError::from)?;
        }
        wtxn.commit().map_err(crate::LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::tests::temp_store;
    use sbi_store::VoteDelivery;
    use sbi_types::Timestamp;

    #[test]
    fn put_members_is_one_batch() {
        let (_dir, store) = temp_store();
        let members: Vec<_> = ["carol", "alice", "bob"]
            .iter()
            .map(|n| MemberState::new(AccountName::new(*n)))
            .collect();
        store.put_members(&members).unwrap();
        let names: Vec<String> = store
            .all_members()
            .unwrap()
            .iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn vote_delivery_reduces_balance() {
        let (_dir, store) = temp_store();
        let mut m = MemberState::new(AccountName::new("alice"));
        m.subscribed_rshares = 1_000;
        m.balance_rshares = 1_000;
        store.put_member(&m).unwrap();

        let after = store
            .record_vote_delivery(
                &m.id,
                &VoteDelivery {
                    delivered_rshares: 400,
                    voted_at: Timestamp::new(50),
                },
            )
            .unwrap();
        assert_eq!(after.balance_rshares, 600);
        assert_eq!(after.rewarded_rshares, 400);
        assert_eq!(after.last_received_vote, Some(Timestamp::new(50)));
        assert!(after.invariant_violation().is_none());
        assert_eq!(store.get_member(&m.id).unwrap(), Some(after));
    }

    #[test]
    fn remove_member_deletes_row() {
        let (_dir, store) = temp_store();
        let m = MemberState::new(AccountName::new("alice"));
        store.put_member(&m).unwrap();
        store.remove_member(&m.id).unwrap();
        assert!(store.get_member(&m.id).unwrap().is_none());
    }

    #[test]
    fn delay_update_is_clamped() {
        let (_dir, store) = temp_store();
        let m = MemberState::new(AccountName::new("alice"));
        store.put_member(&m).unwrap();
        store.update_upvote_delay(&m.id, 20.0).unwrap();
        assert_eq!(store.get_member(&m.id).unwrap().unwrap().upvote_delay, 100.0);
    }
}
