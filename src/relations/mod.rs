//! Friendships and parent/child supervision links

mod family;
mod friends;
mod models;
mod sqlite_relations;
mod store;

pub use family::FamilyManager;
pub use friends::FriendManager;
pub use models::{
    FamilyLinkState, FamilyRequest, FamilyRequestEntry, FriendRequest, FriendRequests,
    RequestEntry,
};
pub use store::RelationsStore;
