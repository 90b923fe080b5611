use anyhow::Result;

use super::models::{Comment, CommunityCounts, Post, Privacy};

/// Which posts a listing query may return to a viewer.
#[derive(Debug, Clone)]
pub struct VisibilityScope<'a> {
    pub viewer_id: usize,
    pub friend_ids: &'a [usize],
    pub author_id: Option<usize>,
}

pub trait CommunityStore: Send + Sync {
    /// Stores a post and, for polls, its options in order.
    fn create_post(&self, post: &Post, poll_options: &[String]) -> Result<()>;

    fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    /// Posts visible within `scope`, newest first.
    fn list_visible_posts(
        &self,
        scope: &VisibilityScope,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Post>>;

    /// Deletes the post with its comments, likes and votes. Shares of it
    /// are left untouched.
    fn delete_post(&self, post_id: &str) -> Result<bool>;

    fn update_privacy(&self, post_id: &str, privacy: Privacy) -> Result<bool>;

    /// Inserts `share` and bumps the shares counter of `original_id`
    /// in one transaction.
    fn share_post(&self, original_id: &str, share: &Post) -> Result<()>;

    /// Flips the like of `user_id` on the post; returns whether it is now liked.
    fn toggle_like(&self, post_id: &str, user_id: usize) -> Result<bool>;

    fn count_likes(&self, post_id: &str) -> Result<usize>;

    fn has_liked(&self, post_id: &str, user_id: usize) -> Result<bool>;

    fn add_comment(&self, comment: &Comment) -> Result<()>;

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    /// Comments of a post, oldest first.
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    fn delete_comment(&self, comment_id: &str) -> Result<bool>;

    fn count_comments(&self, post_id: &str) -> Result<usize>;

    fn get_poll_options(&self, post_id: &str) -> Result<Vec<String>>;

    /// Records or replaces the vote of `user_id` on a poll.
    fn upsert_vote(&self, post_id: &str, user_id: usize, option_index: usize) -> Result<()>;

    fn get_vote(&self, post_id: &str, user_id: usize) -> Result<Option<usize>>;

    /// Vote count per option index; options without votes are absent.
    fn count_votes(&self, post_id: &str) -> Result<Vec<(usize, usize)>>;

    fn count(&self) -> Result<CommunityCounts>;
}
