//! LMDB implementation of PostStore.

use sbi_store::{PostStore, StoreError};
use sbi_types::{Authorperm, PendingPost};

use crate::LmdbStore;

fn post_key(authorperm: &Authorperm) -> Vec<u8> {
    authorperm.to_string().into_bytes()
}

impl PostStore for LmdbStore {
    fn put_post(&self, post: &PendingPost) -> Result<(), StoreError> {
        self.put_row(self.posts_db, &post_key(&post.authorperm), post)?;
        Ok(())
    }

    fn get_post(&self, authorperm: &Authorperm) -> Result<Option<PendingPost>, StoreError> {
        Ok(self.get_row(self.posts_db, &post_key(authorperm))?)
    }

    fn all_posts(&self) -> Result<Vec<PendingPost>, StoreError> {
        Ok(self.scan(self.posts_db)?)
    }

    fn delete_post(&self, authorperm: &Authorperm) -> Result<(), StoreError> {
        self.delete_row(self.posts_db, &post_key(authorperm))?;
        Ok(())
    }
}
