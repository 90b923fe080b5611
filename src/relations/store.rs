use anyhow::Result;

use super::models::{FamilyRequest, FriendRequest};

/// Social graph storage: friendships and parent/child links.
pub trait RelationsStore: Send + Sync {
    fn add_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<()>;

    fn get_friend_request(
        &self,
        from_user_id: usize,
        to_user_id: usize,
    ) -> Result<Option<FriendRequest>>;

    /// Returns false if there was no such request.
    fn delete_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<bool>;

    fn list_incoming_friend_requests(&self, user_id: usize) -> Result<Vec<FriendRequest>>;

    fn list_outgoing_friend_requests(&self, user_id: usize) -> Result<Vec<FriendRequest>>;

    /// Consumes the pending request and stores the friendship in both
    /// directions, atomically. Returns false if no such request was pending.
    fn accept_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<bool>;

    fn are_friends(&self, user_a: usize, user_b: usize) -> Result<bool>;

    /// Returns false if the two users were not friends.
    fn remove_friendship(&self, user_a: usize, user_b: usize) -> Result<bool>;

    fn list_friend_ids(&self, user_id: usize) -> Result<Vec<usize>>;

    fn add_family_request(&self, request: &FamilyRequest) -> Result<()>;

    fn get_family_request(&self, parent_id: usize, child_id: usize)
        -> Result<Option<FamilyRequest>>;

    fn delete_family_request(&self, parent_id: usize, child_id: usize) -> Result<bool>;

    /// Pending requests where the user is either the parent or the child.
    fn list_family_requests(&self, user_id: usize) -> Result<Vec<FamilyRequest>>;

    /// Consumes the pending request and stores the link, atomically.
    /// Returns false if no such request was pending.
    fn accept_family_request(&self, parent_id: usize, child_id: usize) -> Result<bool>;

    fn is_family_linked(&self, parent_id: usize, child_id: usize) -> Result<bool>;

    fn delete_family_link(&self, parent_id: usize, child_id: usize) -> Result<bool>;

    fn list_children(&self, parent_id: usize) -> Result<Vec<usize>>;

    fn list_parents(&self, child_id: usize) -> Result<Vec<usize>>;
}
