//! Pending post storage trait.

use crate::StoreError;
use sbi_types::{Authorperm, PendingPost, Timestamp};

pub trait PostStore {
    fn put_post(&self, post: &PendingPost) -> Result<(), StoreError>;
    fn get_post(&self, authorperm: &Authorperm) -> Result<Option<PendingPost>, StoreError>;
    fn all_posts(&self) -> Result<Vec<PendingPost>, StoreError>;
    fn delete_post(&self, authorperm: &Authorperm) -> Result<(), StoreError>;

    /// Posts that have not been voted on and are not filtered out.
    fn unvoted_posts(&self) -> Result<Vec<PendingPost>, StoreError> {
        let mut posts: Vec<PendingPost> = self
            .all_posts()?
            .into_iter()
            .filter(|p| !p.voted && !p.skip)
            .collect();
        posts.sort_by_key(|p| p.created);
        Ok(posts)
    }

    fn mark_voted(
        &self,
        authorperm: &Authorperm,
        voted: bool,
        voted_after: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut post = self
            .get_post(authorperm)?
            .ok_or_else(|| StoreError::NotFound(authorperm.to_string()))?;
        post.voted = voted;
        post.voted_after = voted_after;
        self.put_post(&post)
    }

    fn latest_post_block(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.all_posts()?.iter().map(|p| p.block).max())
    }

    /// Drop posts created before `cutoff`. Returns how many were removed.
    fn delete_posts_before(&self, cutoff: Timestamp) -> Result<usize, StoreError> {
        let old: Vec<_> = self
            .all_posts()?
            .into_iter()
            .filter(|p| p.created < cutoff)
            .collect();
        for p in &old {
            self.delete_post(&p.authorperm)?;
        }
        Ok(old.len())
    }
}
