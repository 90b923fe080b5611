use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use super::community_store::{CommunityStore, VisibilityScope};
use super::models::{Comment, CommunityCounts, Post, PostType, Privacy, Stance};

const POST_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "post",
    foreign_column: "id",
    cascade_on_delete: true,
};

/// V 0
/// `shared_from` has no foreign key, shares outlive the post they point to.
const POST_TABLE_V_0: Table = Table {
    name: "post",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("post_type", &SqlType::Text, non_null = true),
        sqlite_column!("privacy", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("course_id", &SqlType::Text),
        sqlite_column!("shared_from", &SqlType::Text),
        sqlite_column!(
            "shares_count",
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
    indices: &[
        ("idx_post_author_id", "author_id"),
        ("idx_post_created", "created"),
    ],
};
const COMMENT_TABLE_V_0: Table = Table {
    name: "post_comment",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FOREIGN_KEY)
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("stance", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_post_comment_post_id", "post_id")],
};
const LIKE_TABLE_V_0: Table = Table {
    name: "post_like",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FOREIGN_KEY)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["post_id", "user_id"]],
    indices: &[],
};
const POLL_OPTION_TABLE_V_0: Table = Table {
    name: "poll_option",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FOREIGN_KEY)
        ),
        sqlite_column!("option_index", &SqlType::Integer, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
    ],
    unique_constraints: &[&["post_id", "option_index"]],
    indices: &[],
};
const POLL_VOTE_TABLE_V_0: Table = Table {
    name: "poll_vote",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&POST_FOREIGN_KEY)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("option_index", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["post_id", "user_id"]],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        POST_TABLE_V_0,
        COMMENT_TABLE_V_0,
        LIKE_TABLE_V_0,
        POLL_OPTION_TABLE_V_0,
        POLL_VOTE_TABLE_V_0,
    ],
    migration: None,
}];

const POST_COLUMNS: &str =
    "id, author_id, post_type, privacy, content, image_url, course_id, shared_from, shares_count, created";

fn text_enum<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>, what: &str) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("Unknown {} {}", what, value).into(),
        )
    })
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        post_type: text_enum(row, 2, PostType::from_str, "post type")?,
        privacy: text_enum(row, 3, Privacy::from_str, "privacy")?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        course_id: row.get(6)?,
        shared_from: row.get(7)?,
        shares_count: row.get(8)?,
        created: row.get(9)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    let stance: Option<String> = row.get(4)?;
    let stance = match stance {
        Some(name) => Some(Stance::from_str(&name).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("Unknown stance {}", name).into(),
            )
        })?),
        None => None,
    };
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        stance,
        created: row.get(5)?,
    })
}

fn insert_post(conn: &Connection, post: &Post) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            POST_TABLE_V_0.name, POST_COLUMNS
        ),
        params![
            post.id,
            post.author_id,
            post.post_type.as_str(),
            post.privacy.as_str(),
            post.content,
            post.image_url,
            post.course_id,
            post.shared_from,
            post.shares_count,
            post.created,
        ],
    )
    .with_context(|| format!("Failed to insert post {}", post.id))?;
    Ok(())
}

#[derive(Clone)]
pub struct SqliteCommunityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCommunityStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteCommunityStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl CommunityStore for SqliteCommunityStore {
    fn create_post(&self, post: &Post, poll_options: &[String]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        insert_post(&tx, post)?;
        for (index, text) in poll_options.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {} (post_id, option_index, text) VALUES (?1, ?2, ?3)",
                    POLL_OPTION_TABLE_V_0.name
                ),
                params![post.id, index, text],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    POST_COLUMNS, POST_TABLE_V_0.name
                ),
                params![post_id],
                post_from_row,
            )
            .optional()?)
    }

    fn list_visible_posts(
        &self,
        scope: &VisibilityScope,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Post>> {
        // Ids are integers and get inlined.
        let friend_list = scope
            .friend_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let author_filter = match scope.author_id {
            Some(author_id) => format!("AND author_id = {}", author_id),
            None => String::new(),
        };
        let sql = format!(
            "SELECT {columns} FROM {table}
             WHERE (privacy = 'public' OR author_id = ?1 OR (privacy = 'friends' AND author_id IN ({friends})))
             {author_filter}
             ORDER BY created DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            columns = POST_COLUMNS,
            table = POST_TABLE_V_0.name,
            friends = friend_list,
            author_filter = author_filter,
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params![scope.viewer_id, limit, offset], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn delete_post(&self, post_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", POST_TABLE_V_0.name),
            params![post_id],
        )?;
        Ok(deleted > 0)
    }

    fn update_privacy(&self, post_id: &str, privacy: Privacy) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!("UPDATE {} SET privacy = ?1 WHERE id = ?2", POST_TABLE_V_0.name),
            params![privacy.as_str(), post_id],
        )?;
        Ok(updated > 0)
    }

    fn share_post(&self, original_id: &str, share: &Post) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        insert_post(&tx, share)?;
        let updated = tx.execute(
            &format!(
                "UPDATE {} SET shares_count = shares_count + 1 WHERE id = ?1",
                POST_TABLE_V_0.name
            ),
            params![original_id],
        )?;
        if updated == 0 {
            anyhow::bail!("Shared post {} disappeared", original_id);
        }
        tx.commit()?;
        Ok(())
    }

    fn toggle_like(&self, post_id: &str, user_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            &format!(
                "DELETE FROM {} WHERE post_id = ?1 AND user_id = ?2",
                LIKE_TABLE_V_0.name
            ),
            params![post_id, user_id],
        )?;
        if removed == 0 {
            tx.execute(
                &format!(
                    "INSERT INTO {} (post_id, user_id) VALUES (?1, ?2)",
                    LIKE_TABLE_V_0.name
                ),
                params![post_id, user_id],
            )?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    fn count_likes(&self, post_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE post_id = ?1",
                LIKE_TABLE_V_0.name
            ),
            params![post_id],
            |row| row.get(0),
        )?)
    }

    fn has_liked(&self, post_id: &str, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE post_id = ?1 AND user_id = ?2)",
                LIKE_TABLE_V_0.name
            ),
            params![post_id, user_id],
            |row| row.get(0),
        )?)
    }

    fn add_comment(&self, comment: &Comment) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, post_id, author_id, content, stance, created) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                COMMENT_TABLE_V_0.name
            ),
            params![
                comment.id,
                comment.post_id,
                comment.author_id,
                comment.content,
                comment.stance.map(|s| s.as_str()),
                comment.created,
            ],
        )
        .with_context(|| format!("Failed to add comment to post {}", comment.post_id))?;
        Ok(())
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT id, post_id, author_id, content, stance, created FROM {} WHERE id = ?1",
                    COMMENT_TABLE_V_0.name
                ),
                params![comment_id],
                comment_from_row,
            )
            .optional()?)
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, post_id, author_id, content, stance, created FROM {} WHERE post_id = ?1 ORDER BY created, rowid",
            COMMENT_TABLE_V_0.name
        ))?;
        let comments = stmt
            .query_map(params![post_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", COMMENT_TABLE_V_0.name),
            params![comment_id],
        )?;
        Ok(deleted > 0)
    }

    fn count_comments(&self, post_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE post_id = ?1",
                COMMENT_TABLE_V_0.name
            ),
            params![post_id],
            |row| row.get(0),
        )?)
    }

    fn get_poll_options(&self, post_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT text FROM {} WHERE post_id = ?1 ORDER BY option_index",
            POLL_OPTION_TABLE_V_0.name
        ))?;
        let options = stmt
            .query_map(params![post_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(options)
    }

    fn upsert_vote(&self, post_id: &str, user_id: usize, option_index: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (post_id, user_id, option_index) VALUES (?1, ?2, ?3)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET option_index = excluded.option_index",
                POLL_VOTE_TABLE_V_0.name
            ),
            params![post_id, user_id, option_index],
        )?;
        Ok(())
    }

    fn get_vote(&self, post_id: &str, user_id: usize) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT option_index FROM {} WHERE post_id = ?1 AND user_id = ?2",
                    POLL_VOTE_TABLE_V_0.name
                ),
                params![post_id, user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn count_votes(&self, post_id: &str) -> Result<Vec<(usize, usize)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT option_index, COUNT(*) FROM {} WHERE post_id = ?1 GROUP BY option_index ORDER BY option_index",
            POLL_VOTE_TABLE_V_0.name
        ))?;
        let counts = stmt
            .query_map(params![post_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn count(&self) -> Result<CommunityCounts> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str, filter: &str| -> Result<usize> {
            Ok(conn.query_row(
                &format!("SELECT COUNT(*) FROM {} {}", table, filter),
                [],
                |row| row.get(0),
            )?)
        };
        Ok(CommunityCounts {
            posts: count(POST_TABLE_V_0.name, "")?,
            comments: count(COMMENT_TABLE_V_0.name, "")?,
            likes: count(LIKE_TABLE_V_0.name, "")?,
            shares: count(POST_TABLE_V_0.name, "WHERE post_type = 'share'")?,
        })
    }
}
