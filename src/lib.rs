//! SkillWise Server Library
//!
//! This library exposes the internal modules for testing and for the binaries.

pub mod community;
pub mod config;
pub mod error;
pub mod learning;
pub mod marketplace;
pub mod notifications;
pub mod relations;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use community::SqliteCommunityStore;
pub use learning::SqliteLearningStore;
pub use marketplace::SqliteMarketplaceStore;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserManager, UserRole};
