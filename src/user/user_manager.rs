use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use super::{
    auth::SkillwiseHasher,
    is_below_age,
    permissions::UserRole,
    user_models::{NewUser, RegisterRequest, User, UserCounts},
    AuthToken, AuthTokenValue, FullUserStore, UserAuthCredentials, UsernamePasswordCredentials,
};
use crate::error::{FieldError, ServiceError, ServiceResult, Validator};
use crate::notifications::{NotificationType, Notifier};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

lazy_static! {
    static ref HANDLE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
}

pub struct UserManager {
    user_store: Arc<dyn FullUserStore>,
    notifier: Notifier,
    min_unsupervised_age: u32,
}

impl UserManager {
    pub fn new(
        user_store: Arc<dyn FullUserStore>,
        notifier: Notifier,
        min_unsupervised_age: u32,
    ) -> Self {
        Self {
            user_store,
            notifier,
            min_unsupervised_age,
        }
    }

    /// Creates an account with no password, for operator tooling.
    pub fn add_user<T: AsRef<str>>(&self, user_handle: T, role: UserRole) -> Result<usize> {
        let user_handle = user_handle.as_ref();
        if !HANDLE_REGEX.is_match(user_handle) {
            bail!("Invalid user handle {:?}", user_handle);
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }
        self.user_store
            .create_user(&NewUser::with_role(user_handle, role))
    }

    /// Self-service sign up. Accounts under the unsupervised age must be Child
    /// accounts and start blocked until a linked parent confirms them.
    pub fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        let role = UserRole::from_str(&request.role);
        let this_year = super::current_year();
        let below_age = is_below_age(request.birth_year, self.min_unsupervised_age);
        Validator::new()
            .check(
                HANDLE_REGEX.is_match(&request.handle),
                "handle",
                "must be 3-32 characters of letters, digits, '_', '.' or '-'",
            )
            .check(
                request.password.chars().count() >= MIN_PASSWORD_LENGTH,
                "password",
                "must be at least 8 characters",
            )
            .max_len(&request.password, MAX_PASSWORD_LENGTH, "password")
            .check(
                request
                    .email
                    .as_deref()
                    .map(|email| email.contains('@') && email.len() <= 254)
                    .unwrap_or(true),
                "email",
                "must be a valid email address",
            )
            .check(
                role.map(UserRole::is_self_registrable).unwrap_or(false),
                "role",
                "must be one of Student, Teacher, Parent, Child",
            )
            .check(
                request
                    .birth_year
                    .map(|year| (1900..=this_year).contains(&year))
                    .unwrap_or(true),
                "birthYear",
                "must be a past year",
            )
            .check(
                !below_age || role.map(|role| role == UserRole::Child).unwrap_or(true),
                "birthYear",
                "accounts under the unsupervised age must register as Child",
            )
            .finish()?;
        let role = role.ok_or_else(|| {
            ServiceError::Validation(vec![FieldError::new("role", "unknown role")])
        })?;

        if self.user_store.get_user_id(&request.handle)?.is_some() {
            return Err(ServiceError::bad_request("This handle is already taken"));
        }

        let user_id = self.user_store.create_user(&NewUser {
            handle: request.handle.clone(),
            email: request.email.clone(),
            role,
            birth_year: request.birth_year,
            blocked: below_age,
        })?;
        self.set_password(&request.handle, &request.password)?;
        if below_age {
            info!(
                "User {} registered under the unsupervised age, blocked until a parent confirms",
                request.handle
            );
        }
        self.get_user(user_id)
    }

    fn create_hashed_password(
        user_id: usize,
        password: &str,
    ) -> Result<UsernamePasswordCredentials> {
        let hasher = SkillwiseHasher::Argon2;
        let salt = hasher.generate_b64_salt()?;
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    /// Creates or replaces the password of `user_handle`.
    pub fn set_password(&self, user_handle: &str, password: &str) -> Result<()> {
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store.get_user_auth_credentials(user_handle)
    }

    /// Checks the password and issues a new session token.
    pub fn login(&self, user_handle: &str, password: &str) -> ServiceResult<(AuthToken, User)> {
        let invalid = || ServiceError::Unauthorized("Invalid handle or password".to_string());
        let credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .ok_or_else(invalid)?;
        let password_credentials = credentials.username_password.as_ref().ok_or_else(invalid)?;

        let verified = password_credentials
            .hasher
            .verify(password, password_credentials.hash.as_str())?;
        self.user_store
            .record_password_attempt(credentials.user_id, verified)?;
        if !verified {
            warn!("Failed login attempt for {}", user_handle);
            return Err(invalid());
        }

        let token = self.generate_auth_token(&credentials)?;
        let user = self.get_user(credentials.user_id)?;
        Ok((token, user))
    }

    pub fn generate_auth_token(&self, credentials: &UserAuthCredentials) -> Result<AuthToken> {
        let token = AuthToken {
            user_id: credentials.user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(token.clone())?;
        Ok(token)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.get_user_auth_token(value)
    }

    pub fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)
    }

    /// Deletes the token, refusing to touch tokens owned by someone else.
    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        match self.user_store.get_user_auth_token(token_value)? {
            Some(token) if token.user_id == user_id => {
                self.user_store.delete_user_auth_token(token_value)?;
                Ok(())
            }
            Some(token) => bail!(
                "Tried to delete auth token of user {}, but the authenticated user is {}",
                token.user_id,
                user_id
            ),
            None => bail!("Did not find auth token"),
        }
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_user(&self, user_id: usize) -> ServiceResult<User> {
        self.user_store
            .get_user(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub fn find_user(&self, user_id: usize) -> Result<Option<User>> {
        self.user_store.get_user(user_id)
    }

    pub fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.user_store.get_user_id(user_handle)
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.user_store.list_users()?)
    }

    pub fn count_users(&self) -> ServiceResult<UserCounts> {
        Ok(self.user_store.count_users()?)
    }

    /// Operator path: any role, no notification.
    pub fn force_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        if !self.user_store.set_user_role(user_id, role)? {
            bail!("User {} not found", user_id);
        }
        Ok(())
    }

    /// Admin role change. Admins may only hand out Admin, Student, Teacher or
    /// Child, and never change their own role.
    pub fn set_role(&self, acting_admin_id: usize, user_id: usize, role: &str) -> ServiceResult<User> {
        let role = UserRole::from_str(role)
            .filter(|role| role.is_admin_assignable())
            .ok_or_else(|| {
                ServiceError::Validation(vec![FieldError::new(
                    "role",
                    "must be one of Admin, Student, Teacher, Child",
                )])
            })?;
        if acting_admin_id == user_id {
            return Err(ServiceError::forbidden("You cannot change your own role"));
        }
        if !self.user_store.set_user_role(user_id, role)? {
            return Err(ServiceError::NotFound("User"));
        }
        info!("Admin {} set role of user {} to {}", acting_admin_id, user_id, role);
        self.notifier.notify(
            user_id,
            Some(acting_admin_id),
            NotificationType::RoleChanged,
            json!({ "role": role.as_str() }),
        );
        self.get_user(user_id)
    }

    pub fn set_blocked(
        &self,
        acting_admin_id: usize,
        user_id: usize,
        blocked: bool,
    ) -> ServiceResult<User> {
        if acting_admin_id == user_id {
            return Err(ServiceError::forbidden("You cannot block or unblock yourself"));
        }
        if !self.user_store.set_user_blocked(user_id, blocked)? {
            return Err(ServiceError::NotFound("User"));
        }
        info!(
            "Admin {} {} user {}",
            acting_admin_id,
            if blocked { "blocked" } else { "unblocked" },
            user_id
        );
        self.notifier.notify(
            user_id,
            Some(acting_admin_id),
            if blocked {
                NotificationType::AccountBlocked
            } else {
                NotificationType::AccountUnblocked
            },
            json!({}),
        );
        self.get_user(user_id)
    }
}
