//! Skill marketplace with a moderation queue

mod marketplace_manager;
mod marketplace_store;
pub mod models;
mod sqlite_marketplace_store;

pub use marketplace_manager::MarketplaceManager;
pub use marketplace_store::MarketplaceStore;
pub use models::{
    Listing, ListingDraft, ListingStatus, MarketplaceCounts, ModerationDecision,
    ModerationRequest,
};
pub use sqlite_marketplace_store::SqliteMarketplaceStore;
