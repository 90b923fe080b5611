pub mod auth;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, UserAuthCredentials, UsernamePasswordCredentials};
pub use permissions::{resolve_permissions, Permission, UserRole};
pub use sqlite_user_store::SqliteUserStore;
pub(crate) use sqlite_user_store::{
    FAMILY_LINK_TABLE_V_0 as FAMILY_LINK_TABLE, FAMILY_REQUEST_TABLE_V_0 as FAMILY_REQUEST_TABLE,
    FRIENDSHIP_TABLE_V_0 as FRIENDSHIP_TABLE, FRIEND_REQUEST_TABLE_V_0 as FRIEND_REQUEST_TABLE,
    NOTIFICATION_TABLE_V_0 as NOTIFICATION_TABLE,
};
pub use user_manager::UserManager;
pub use user_models::{
    current_year, is_below_age, Actor, NewUser, PublicProfile, RegisterRequest, User, UserCounts,
};
pub use user_store::{FullUserStore, UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
