//! User data models

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::permissions::UserRole;

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Whether someone born in `birth_year` is younger than `min_age` this year.
/// Unknown birth years are never considered under age.
pub fn is_below_age(birth_year: Option<i32>, min_age: u32) -> bool {
    birth_year
        .map(|year| current_year() - year < min_age as i32)
        .unwrap_or(false)
}

/// A SkillWise account as stored in `user.db`.
///
/// The childlock hash never leaves the store through this type; callers only
/// learn whether one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: usize,
    pub handle: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub birth_year: Option<i32>,
    pub blocked: bool,
    pub parent_confirmed: bool,
    pub has_childlock: bool,
    pub created: i64,
}

impl User {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            handle: self.handle.clone(),
            role: self.role,
            created: self.created,
        }
    }

    pub fn is_below_age(&self, min_age: u32) -> bool {
        is_below_age(self.birth_year, min_age)
    }
}

/// What other users get to see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: usize,
    pub handle: String,
    pub role: UserRole,
    pub created: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub handle: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub birth_year: Option<i32>,
    pub blocked: bool,
}

impl NewUser {
    pub fn with_role<T: Into<String>>(handle: T, role: UserRole) -> Self {
        Self {
            handle: handle.into(),
            email: None,
            role,
            birth_year: None,
            blocked: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub handle: String,
    pub password: String,
    pub email: Option<String>,
    pub role: String,
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: usize,
    pub blocked: usize,
    pub students: usize,
    pub teachers: usize,
    pub parents: usize,
    pub children: usize,
    pub admins: usize,
}

impl UserCounts {
    pub fn add_role(&mut self, role: UserRole, count: usize) {
        self.total += count;
        match role {
            UserRole::Student => self.students += count,
            UserRole::Teacher => self.teachers += count,
            UserRole::Parent => self.parents += count,
            UserRole::Child => self.children += count,
            UserRole::Admin => self.admins += count,
        }
    }
}

/// The authenticated caller of a manager operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: usize,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: usize, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners act on their own content, admins on anyone's.
    pub fn can_manage(&self, owner_id: usize) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}
