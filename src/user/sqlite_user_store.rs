use crate::sqlite_column;
use crate::sqlite_persistence::{
    now_secs, open_versioned_db, ForeignKey, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::{debug, info};

use super::auth::SkillwiseHasher;

const USER_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    cascade_on_delete: true,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("birth_year", &SqlType::Integer),
        sqlite_column!(
            "blocked",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "parent_confirmed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
pub(crate) const FRIEND_REQUEST_TABLE_V_0: Table = Table {
    name: "friend_request",
    columns: &[
        sqlite_column!(
            "from_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "to_user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["from_user_id", "to_user_id"]],
    indices: &[("idx_friend_request_to", "to_user_id")],
};
/// One row per direction, so `user_id` alone answers "who are my friends".
pub(crate) const FRIENDSHIP_TABLE_V_0: Table = Table {
    name: "friendship",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "friend_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "friend_id"]],
    indices: &[("idx_friendship_user_id", "user_id")],
};
pub(crate) const FAMILY_REQUEST_TABLE_V_0: Table = Table {
    name: "family_request",
    columns: &[
        sqlite_column!(
            "parent_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "child_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("initiator_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["parent_id", "child_id"]],
    indices: &[],
};
pub(crate) const FAMILY_LINK_TABLE_V_0: Table = Table {
    name: "family_link",
    columns: &[
        sqlite_column!(
            "parent_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "child_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["parent_id", "child_id"]],
    indices: &[("idx_family_link_child_id", "child_id")],
};
pub(crate) const NOTIFICATION_TABLE_V_0: Table = Table {
    name: "notification",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "recipient_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("sender_id", &SqlType::Integer),
        sqlite_column!("notification_type", &SqlType::Text, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_read",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_notification_recipient", "recipient_id")],
};

/// V 1
pub(crate) const USER_TABLE_V_1: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("birth_year", &SqlType::Integer),
        sqlite_column!(
            "blocked",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "parent_confirmed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("childlock_hash", &SqlType::Text),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            FRIEND_REQUEST_TABLE_V_0,
            FRIENDSHIP_TABLE_V_0,
            FAMILY_REQUEST_TABLE_V_0,
            FAMILY_LINK_TABLE_V_0,
            NOTIFICATION_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_1,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            FRIEND_REQUEST_TABLE_V_0,
            FRIENDSHIP_TABLE_V_0,
            FAMILY_REQUEST_TABLE_V_0,
            FAMILY_LINK_TABLE_V_0,
            NOTIFICATION_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute("ALTER TABLE user ADD COLUMN childlock_hash TEXT", [])?;
            Ok(())
        }),
    },
];

const USER_SELECT_COLUMNS: &str = "id, handle, email, role, birth_year, blocked, parent_confirmed, childlock_hash IS NOT NULL, created";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let role = UserRole::from_str(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("Unknown role {}", role_str).into(),
        )
    })?;
    Ok(User {
        id: row.get(0)?,
        handle: row.get(1)?,
        email: row.get(2)?,
        role,
        birth_year: row.get(4)?,
        blocked: row.get(5)?,
        parent_confirmed: row.get(6)?,
        has_childlock: row.get(7)?,
        created: row.get(8)?,
    })
}

fn auth_token_from_row(row: &Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get(0)?,
        value: AuthTokenValue(row.get(1)?),
        created: system_time_from_column_result(row.get(2)?),
        last_used: row
            .get::<usize, Option<i64>>(3)?
            .map(system_time_from_column_result),
    })
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn secs_from_system_time(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: &NewUser) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (handle, email, role, birth_year, blocked) VALUES (?1, ?2, ?3, ?4, ?5)",
                USER_TABLE_V_1.name
            ),
            params![
                new_user.handle,
                new_user.email,
                new_user.role.as_str(),
                new_user.birth_year,
                new_user.blocked
            ],
        )
        .with_context(|| format!("Failed to create user {}", new_user.handle))?;
        let id = conn.last_insert_rowid() as usize;
        info!("Created user {} with id {}", new_user.handle, id);
        Ok(id)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    USER_SELECT_COLUMNS, USER_TABLE_V_1.name
                ),
                params![user_id],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT id FROM {} WHERE handle = ?1", USER_TABLE_V_1.name),
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY id",
            USER_SELECT_COLUMNS, USER_TABLE_V_1.name
        ))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<User>, _>>()?;
        Ok(users)
    }

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!("UPDATE {} SET role = ?1 WHERE id = ?2", USER_TABLE_V_1.name),
            params![role.as_str(), user_id],
        )?;
        Ok(updated > 0)
    }

    fn set_user_blocked(&self, user_id: usize, blocked: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET blocked = ?1 WHERE id = ?2",
                USER_TABLE_V_1.name
            ),
            params![blocked, user_id],
        )?;
        Ok(updated > 0)
    }

    fn set_parent_confirmed(&self, user_id: usize, confirmed: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET parent_confirmed = ?1 WHERE id = ?2 AND parent_confirmed != ?1",
                USER_TABLE_V_1.name
            ),
            params![confirmed, user_id],
        )?;
        Ok(updated > 0)
    }

    fn set_childlock_hash(&self, user_id: usize, hash: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET childlock_hash = ?1 WHERE id = ?2",
                USER_TABLE_V_1.name
            ),
            params![hash, user_id],
        )?;
        Ok(())
    }

    fn get_childlock_hash(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let hash: Option<Option<String>> = conn
            .query_row(
                &format!(
                    "SELECT childlock_hash FROM {} WHERE id = ?1",
                    USER_TABLE_V_1.name
                ),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    fn count_users(&self) -> Result<UserCounts> {
        let conn = self.conn.lock().unwrap();
        let mut counts = UserCounts::default();
        let mut stmt = conn.prepare(&format!(
            "SELECT role, COUNT(*) FROM {} GROUP BY role",
            USER_TABLE_V_1.name
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<usize, String>(0)?, row.get::<usize, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (role, count) in rows {
            if let Some(role) = UserRole::from_str(&role) {
                counts.add_role(role, count as usize);
            }
        }
        counts.blocked = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE blocked = 1",
                USER_TABLE_V_1.name
            ),
            [],
            |row| row.get::<usize, i64>(0),
        )? as usize;
        Ok(counts)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                auth_token_from_row,
            )
            .optional()?)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let Some(token) = self.get_user_auth_token(token)? else {
            return Ok(None);
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM auth_token WHERE value = ?1",
            params![token.value.0],
        )?;
        Ok(Some(token))
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![now_secs(), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created) VALUES (?1, ?2, ?3)",
            params![
                token.user_id,
                token.value.0,
                secs_from_system_time(token.created)
            ],
        )?;
        Ok(())
    }

    fn get_all_user_auth_tokens(&self, user_id: usize) -> Result<Vec<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, value, created, last_used FROM auth_token WHERE user_id = ?1",
        )?;
        let tokens = stmt
            .query_map(params![user_id], auth_token_from_row)?
            .collect::<Result<Vec<AuthToken>, _>>()?;
        Ok(tokens)
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = now_secs() - (unused_for_days as i64) * 24 * 60 * 60;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        debug!("Pruned {} auth tokens unused since {}", deleted, cutoff);
        Ok(deleted)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let Some(user_id) = self.get_user_id(user_handle)? else {
            return Ok(None);
        };
        let conn = self.conn.lock().unwrap();
        let password_credentials = conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created, last_tried, last_used FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let hasher_name: String = row.get(3)?;
                    let hasher = SkillwiseHasher::from_str(&hasher_name).map_err(|err| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            err.into(),
                        )
                    })?;
                    Ok(UsernamePasswordCredentials {
                        user_id: row.get(0)?,
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher,
                        created: system_time_from_column_result(row.get(4)?),
                        last_tried: row
                            .get::<usize, Option<i64>>(5)?
                            .map(system_time_from_column_result),
                        last_used: row
                            .get::<usize, Option<i64>>(6)?
                            .map(system_time_from_column_result),
                    })
                },
            )
            .optional()?;

        Ok(Some(UserAuthCredentials {
            user_id,
            username_password: password_credentials,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let user_id = credentials.user_id;
        match credentials.username_password.as_ref() {
            Some(password_credentials) => {
                conn.execute(
                    "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created) VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
                    params![
                        user_id,
                        password_credentials.salt,
                        password_credentials.hash,
                        password_credentials.hasher.to_string(),
                        secs_from_system_time(password_credentials.created)
                    ],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM user_password_credentials WHERE user_id = ?1",
                    params![user_id],
                )?;
            }
        };
        Ok(())
    }

    fn record_password_attempt(&self, user_id: usize, success: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let sql = if success {
            "UPDATE user_password_credentials SET last_tried = ?1, last_used = ?1 WHERE user_id = ?2"
        } else {
            "UPDATE user_password_credentials SET last_tried = ?1 WHERE user_id = ?2"
        };
        conn.execute(sql, params![now_secs(), user_id])?;
        Ok(())
    }
}
