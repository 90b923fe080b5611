use super::auth::{AuthToken, AuthTokenValue, UserAuthCredentials};
use super::permissions::UserRole;
use super::user_models::{NewUser, User, UserCounts};
use crate::notifications::NotificationStore;
use crate::relations::RelationsStore;
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's authentication credentials given the user handle.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>>;

    /// Replaces the user's authentication credentials.
    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()>;

    /// Stamps the last login attempt, and the last successful one if `success`.
    fn record_password_attempt(&self, user_id: usize, success: bool) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates an auth token with the latest timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Returns all of a user's authentication tokens.
    fn get_all_user_auth_tokens(&self, user_id: usize) -> Result<Vec<AuthToken>>;

    /// Prunes auth tokens that haven't been used for the specified number of days.
    /// Returns the number of tokens that were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, new_user: &NewUser) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns a user's id given the handle.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    /// Returns all users ordered by id.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Returns false if the user does not exist.
    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<bool>;

    /// Returns false if the user does not exist.
    fn set_user_blocked(&self, user_id: usize, blocked: bool) -> Result<bool>;

    /// Sets the parent-confirmed flag.
    /// Returns true only when the stored value actually changed.
    fn set_parent_confirmed(&self, user_id: usize, confirmed: bool) -> Result<bool>;

    /// Stores (or clears, with None) the PHC hash of the user's childlock.
    fn set_childlock_hash(&self, user_id: usize, hash: Option<&str>) -> Result<()>;

    fn get_childlock_hash(&self, user_id: usize) -> Result<Option<String>>;

    fn count_users(&self) -> Result<UserCounts>;
}

/// Everything persisted in `user.db`: accounts plus the social graph and the
/// notification log that reference them.
pub trait FullUserStore: UserStore + RelationsStore + NotificationStore {}

impl<T: UserStore + RelationsStore + NotificationStore> FullUserStore for T {}
