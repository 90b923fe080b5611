use axum::extract::FromRef;

use crate::community::{CommunityManager, CommunityStore};
use crate::learning::{LearningManager, LearningStore};
use crate::marketplace::{MarketplaceManager, MarketplaceStore};
use crate::notifications::Notifier;
use crate::relations::{FamilyManager, FriendManager};
use crate::user::{FullUserStore, UserManager};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedFriendManager = Arc<FriendManager>;
pub type GuardedFamilyManager = Arc<FamilyManager>;
pub type GuardedLearningManager = Arc<LearningManager>;
pub type GuardedCommunityManager = Arc<CommunityManager>;
pub type GuardedMarketplaceManager = Arc<MarketplaceManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub friend_manager: GuardedFriendManager,
    pub family_manager: GuardedFamilyManager,
    pub notifier: Notifier,
    pub learning_manager: GuardedLearningManager,
    pub community_manager: GuardedCommunityManager,
    pub marketplace_manager: GuardedMarketplaceManager,
}

impl ServerState {
    /// Wires every manager on top of the given stores.
    pub fn new(
        config: ServerConfig,
        user_store: Arc<dyn FullUserStore>,
        learning_store: Arc<dyn LearningStore>,
        community_store: Arc<dyn CommunityStore>,
        marketplace_store: Arc<dyn MarketplaceStore>,
    ) -> ServerState {
        let notifier = Notifier::new(user_store.clone());
        let user_manager = UserManager::new(
            user_store.clone(),
            notifier.clone(),
            config.min_unsupervised_age,
        );
        let friend_manager = FriendManager::new(user_store.clone(), notifier.clone());
        let family_manager = FamilyManager::new(
            user_store.clone(),
            notifier.clone(),
            config.min_unsupervised_age,
        );
        let learning_manager = LearningManager::new(learning_store.clone());
        let community_manager = CommunityManager::new(
            community_store,
            user_store,
            learning_store,
            notifier.clone(),
            config.max_post_length,
        );
        let marketplace_manager = MarketplaceManager::new(marketplace_store, notifier.clone());

        ServerState {
            config,
            start_time: Instant::now(),
            user_manager: Arc::new(user_manager),
            friend_manager: Arc::new(friend_manager),
            family_manager: Arc::new(family_manager),
            notifier,
            learning_manager: Arc::new(learning_manager),
            community_manager: Arc::new(community_manager),
            marketplace_manager: Arc::new(marketplace_manager),
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedFriendManager {
    fn from_ref(input: &ServerState) -> Self {
        input.friend_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedFamilyManager {
    fn from_ref(input: &ServerState) -> Self {
        input.family_manager.clone()
    }
}

impl FromRef<ServerState> for Notifier {
    fn from_ref(input: &ServerState) -> Self {
        input.notifier.clone()
    }
}

impl FromRef<ServerState> for GuardedLearningManager {
    fn from_ref(input: &ServerState) -> Self {
        input.learning_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedCommunityManager {
    fn from_ref(input: &ServerState) -> Self {
        input.community_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedMarketplaceManager {
    fn from_ref(input: &ServerState) -> Self {
        input.marketplace_manager.clone()
    }
}
