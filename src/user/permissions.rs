use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AccessCourses,
    EnrollCourses,
    CreateCourses,
    PostCommunity,
    TradeMarketplace,
    ManageFamily,
    ManageUsers,
    ModerateContent,
}

const STUDENT_PERMISSIONS: &[Permission] = &[
    Permission::AccessCourses,
    Permission::EnrollCourses,
    Permission::PostCommunity,
    Permission::TradeMarketplace,
];
const TEACHER_PERMISSIONS: &[Permission] = &[
    Permission::AccessCourses,
    Permission::EnrollCourses,
    Permission::CreateCourses,
    Permission::PostCommunity,
    Permission::TradeMarketplace,
];
const PARENT_PERMISSIONS: &[Permission] = &[
    Permission::AccessCourses,
    Permission::PostCommunity,
    Permission::TradeMarketplace,
    Permission::ManageFamily,
];
const CHILD_PERMISSIONS: &[Permission] = &[
    Permission::AccessCourses,
    Permission::EnrollCourses,
    Permission::PostCommunity,
    Permission::TradeMarketplace,
    Permission::ManageFamily,
];
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AccessCourses,
    Permission::EnrollCourses,
    Permission::CreateCourses,
    Permission::PostCommunity,
    Permission::TradeMarketplace,
    Permission::ManageUsers,
    Permission::ModerateContent,
];
/// What a blocked account keeps, whatever its role.
const BLOCKED_PERMISSIONS: &[Permission] = &[Permission::AccessCourses];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Student,
    Teacher,
    Parent,
    Child,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Student,
        UserRole::Teacher,
        UserRole::Parent,
        UserRole::Child,
        UserRole::Admin,
    ];

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Student => STUDENT_PERMISSIONS,
            UserRole::Teacher => TEACHER_PERMISSIONS,
            UserRole::Parent => PARENT_PERMISSIONS,
            UserRole::Child => CHILD_PERMISSIONS,
            UserRole::Admin => ADMIN_PERMISSIONS,
        }
    }

    /// Roles a visitor may pick when registering.
    pub fn is_self_registrable(self) -> bool {
        !matches!(self, UserRole::Admin)
    }

    /// Roles an administrator may assign through the role endpoint.
    pub fn is_admin_assignable(self) -> bool {
        matches!(
            self,
            UserRole::Admin | UserRole::Student | UserRole::Teacher | UserRole::Child
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "Student",
            UserRole::Teacher => "Teacher",
            UserRole::Parent => "Parent",
            UserRole::Child => "Child",
            UserRole::Admin => "Admin",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" => Some(UserRole::Student),
            "teacher" => Some(UserRole::Teacher),
            "parent" => Some(UserRole::Parent),
            "child" => Some(UserRole::Child),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective permissions of an account: its role's set, reduced to read-only
/// access while the account is blocked.
pub fn resolve_permissions(role: UserRole, blocked: bool) -> Vec<Permission> {
    if blocked {
        BLOCKED_PERMISSIONS.to_vec()
    } else {
        role.permissions().to_vec()
    }
}
