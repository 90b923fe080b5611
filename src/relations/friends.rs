use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::models::{FriendRequests, RequestEntry};
use crate::error::{ServiceError, ServiceResult};
use crate::notifications::{NotificationType, Notifier};
use crate::user::{FullUserStore, PublicProfile, User};

/// Friend requests and friendships. A friendship only exists once the
/// addressee accepts a pending request.
pub struct FriendManager {
    user_store: Arc<dyn FullUserStore>,
    notifier: Notifier,
}

impl FriendManager {
    pub fn new(user_store: Arc<dyn FullUserStore>, notifier: Notifier) -> Self {
        Self {
            user_store,
            notifier,
        }
    }

    fn require_user(&self, user_id: usize) -> ServiceResult<User> {
        self.user_store
            .get_user(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    fn profiles(&self, ids: impl IntoIterator<Item = (usize, i64)>) -> ServiceResult<Vec<RequestEntry>> {
        let mut entries = vec![];
        for (id, created) in ids {
            if let Some(user) = self.user_store.get_user(id)? {
                entries.push(RequestEntry {
                    user: user.public_profile(),
                    created,
                });
            }
        }
        Ok(entries)
    }

    pub fn send_request(&self, from_user_id: usize, to_user_id: usize) -> ServiceResult<()> {
        if from_user_id == to_user_id {
            return Err(ServiceError::bad_request("You cannot befriend yourself"));
        }
        let sender = self.require_user(from_user_id)?;
        self.require_user(to_user_id)?;

        if self.user_store.are_friends(from_user_id, to_user_id)? {
            return Err(ServiceError::bad_request("You are already friends"));
        }
        if self
            .user_store
            .get_friend_request(from_user_id, to_user_id)?
            .is_some()
        {
            return Err(ServiceError::bad_request("Friend request already sent"));
        }
        if self
            .user_store
            .get_friend_request(to_user_id, from_user_id)?
            .is_some()
        {
            return Err(ServiceError::bad_request(
                "This user already sent you a friend request, accept it instead",
            ));
        }

        self.user_store
            .add_friend_request(from_user_id, to_user_id)?;
        self.notifier.notify(
            to_user_id,
            Some(from_user_id),
            NotificationType::FriendRequest,
            json!({ "fromUserId": from_user_id, "fromHandle": sender.handle }),
        );
        Ok(())
    }

    /// Accepts the request `from_user_id` sent to `acting_user_id`.
    pub fn accept_request(
        &self,
        acting_user_id: usize,
        from_user_id: usize,
    ) -> ServiceResult<PublicProfile> {
        let friend = self.require_user(from_user_id)?;
        if !self
            .user_store
            .accept_friend_request(from_user_id, acting_user_id)?
        {
            return Err(ServiceError::bad_request(
                "No pending friend request from this user",
            ));
        }
        info!("Users {} and {} are now friends", from_user_id, acting_user_id);
        self.notifier.notify(
            from_user_id,
            Some(acting_user_id),
            NotificationType::FriendAccepted,
            json!({ "userId": acting_user_id }),
        );
        Ok(friend.public_profile())
    }

    pub fn reject_request(&self, acting_user_id: usize, from_user_id: usize) -> ServiceResult<()> {
        if !self
            .user_store
            .delete_friend_request(from_user_id, acting_user_id)?
        {
            return Err(ServiceError::bad_request(
                "No pending friend request from this user",
            ));
        }
        self.notifier.notify(
            from_user_id,
            Some(acting_user_id),
            NotificationType::FriendRejected,
            json!({ "userId": acting_user_id }),
        );
        Ok(())
    }

    pub fn remove_friend(&self, acting_user_id: usize, friend_id: usize) -> ServiceResult<()> {
        if !self
            .user_store
            .remove_friendship(acting_user_id, friend_id)?
        {
            return Err(ServiceError::NotFound("Friendship"));
        }
        Ok(())
    }

    pub fn list_friends(&self, user_id: usize) -> ServiceResult<Vec<PublicProfile>> {
        let mut friends = vec![];
        for id in self.user_store.list_friend_ids(user_id)? {
            if let Some(user) = self.user_store.get_user(id)? {
                friends.push(user.public_profile());
            }
        }
        Ok(friends)
    }

    pub fn friend_ids(&self, user_id: usize) -> ServiceResult<Vec<usize>> {
        Ok(self.user_store.list_friend_ids(user_id)?)
    }

    pub fn are_friends(&self, user_a: usize, user_b: usize) -> ServiceResult<bool> {
        Ok(self.user_store.are_friends(user_a, user_b)?)
    }

    pub fn list_requests(&self, user_id: usize) -> ServiceResult<FriendRequests> {
        let incoming = self
            .user_store
            .list_incoming_friend_requests(user_id)?
            .into_iter()
            .map(|r| (r.from_user_id, r.created));
        let outgoing = self
            .user_store
            .list_outgoing_friend_requests(user_id)?
            .into_iter()
            .map(|r| (r.to_user_id, r.created));
        Ok(FriendRequests {
            incoming: self.profiles(incoming)?,
            outgoing: self.profiles(outgoing)?,
        })
    }
}
