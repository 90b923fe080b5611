use serde::Serialize;

use crate::user::PublicProfile;

/// A pending, directed friend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRequest {
    pub from_user_id: usize,
    pub to_user_id: usize,
    pub created: i64,
}

/// A pending parent/child link. Whoever is not `initiator_id` has to accept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRequest {
    pub parent_id: usize,
    pub child_id: usize,
    pub initiator_id: usize,
    pub created: i64,
}

impl FamilyRequest {
    pub fn involves(&self, user_id: usize) -> bool {
        self.parent_id == user_id || self.child_id == user_id
    }

    pub fn counterpart_of(&self, user_id: usize) -> usize {
        if self.parent_id == user_id {
            self.child_id
        } else {
            self.parent_id
        }
    }
}

/// Where a (parent, child) pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyLinkState {
    Unlinked,
    PendingRequest,
    Linked,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntry {
    pub user: PublicProfile,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequests {
    pub incoming: Vec<RequestEntry>,
    pub outgoing: Vec<RequestEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRequestEntry {
    pub parent_id: usize,
    pub child_id: usize,
    pub initiator_id: usize,
    /// The other side of the request, from the viewer's perspective.
    pub counterpart: PublicProfile,
    /// True when the viewer is the party expected to accept.
    pub awaiting_me: bool,
    pub created: i64,
}
