//! Test fixture creation for the user database

use super::constants::*;
use anyhow::Result;
use skillwise_server::notifications::Notifier;
use skillwise_server::user::{FullUserStore, SqliteUserStore, UserManager, UserRole};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a temporary db directory whose user.db holds one account per
/// role, each with a password.
/// Returns (temp_dir, db_dir)
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_dir = dir.path().to_path_buf();

    let user_store: Arc<dyn FullUserStore> =
        Arc::new(SqliteUserStore::new(db_dir.join("user.db"))?);
    let user_manager = UserManager::new(user_store.clone(), Notifier::new(user_store), 13);

    for (handle, password, role) in [
        (STUDENT_USER, STUDENT_PASS, UserRole::Student),
        (FRIEND_USER, FRIEND_PASS, UserRole::Student),
        (TEACHER_USER, TEACHER_PASS, UserRole::Teacher),
        (PARENT_USER, PARENT_PASS, UserRole::Parent),
        (CHILD_USER, CHILD_PASS, UserRole::Child),
        (ADMIN_USER, ADMIN_PASS, UserRole::Admin),
    ] {
        user_manager.add_user(handle, role)?;
        user_manager.set_password(handle, password)?;
    }

    Ok((dir, db_dir))
}
