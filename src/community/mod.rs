//! Community feed: posts, comments, likes, polls and shares

mod community_manager;
mod community_store;
pub mod models;
mod sqlite_community_store;

pub use community_manager::{CommunityManager, DEFAULT_MAX_POST_LENGTH};
pub use community_store::{CommunityStore, VisibilityScope};
pub use models::{
    Comment, CommentDraft, CommunityCounts, LikeState, Post, PostDraft, PostType, PostView,
    Privacy, ShareRequest, Stance,
};
pub use sqlite_community_store::SqliteCommunityStore;
