use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::models::{FamilyRequest, FriendRequest};
use super::store::RelationsStore;
use crate::sqlite_persistence::now_secs;
use crate::user::{
    SqliteUserStore, FAMILY_LINK_TABLE, FAMILY_REQUEST_TABLE, FRIENDSHIP_TABLE,
    FRIEND_REQUEST_TABLE,
};

impl SqliteUserStore {
    fn query_friend_requests(&self, column: &str, user_id: usize) -> Result<Vec<FriendRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT from_user_id, to_user_id, created FROM {} WHERE {} = ?1 ORDER BY created DESC",
            FRIEND_REQUEST_TABLE.name, column
        ))?;
        let requests = stmt
            .query_map(params![user_id], |row| {
                Ok(FriendRequest {
                    from_user_id: row.get(0)?,
                    to_user_id: row.get(1)?,
                    created: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    fn query_ids(&self, sql: &str, user_id: usize) -> Result<Vec<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<usize>, _>>()?;
        Ok(ids)
    }
}

impl RelationsStore for SqliteUserStore {
    fn add_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (from_user_id, to_user_id, created) VALUES (?1, ?2, ?3)",
                FRIEND_REQUEST_TABLE.name
            ),
            params![from_user_id, to_user_id, now_secs()],
        )
        .with_context(|| {
            format!(
                "Failed to store friend request {} -> {}",
                from_user_id, to_user_id
            )
        })?;
        Ok(())
    }

    fn get_friend_request(
        &self,
        from_user_id: usize,
        to_user_id: usize,
    ) -> Result<Option<FriendRequest>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT from_user_id, to_user_id, created FROM {} WHERE from_user_id = ?1 AND to_user_id = ?2",
                    FRIEND_REQUEST_TABLE.name
                ),
                params![from_user_id, to_user_id],
                |row| {
                    Ok(FriendRequest {
                        from_user_id: row.get(0)?,
                        to_user_id: row.get(1)?,
                        created: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE from_user_id = ?1 AND to_user_id = ?2",
                FRIEND_REQUEST_TABLE.name
            ),
            params![from_user_id, to_user_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_incoming_friend_requests(&self, user_id: usize) -> Result<Vec<FriendRequest>> {
        self.query_friend_requests("to_user_id", user_id)
    }

    fn list_outgoing_friend_requests(&self, user_id: usize) -> Result<Vec<FriendRequest>> {
        self.query_friend_requests("from_user_id", user_id)
    }

    fn accept_friend_request(&self, from_user_id: usize, to_user_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE from_user_id = ?1 AND to_user_id = ?2",
                FRIEND_REQUEST_TABLE.name
            ),
            params![from_user_id, to_user_id],
        )?;
        if deleted == 0 {
            return Ok(false);
        }

        let now = now_secs();
        for (a, b) in [(from_user_id, to_user_id), (to_user_id, from_user_id)] {
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (user_id, friend_id, created) VALUES (?1, ?2, ?3)",
                    FRIENDSHIP_TABLE.name
                ),
                params![a, b, now],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn are_friends(&self, user_a: usize, user_b: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND friend_id = ?2",
                FRIENDSHIP_TABLE.name
            ),
            params![user_a, user_b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn remove_friendship(&self, user_a: usize, user_b: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
                FRIENDSHIP_TABLE.name
            ),
            params![user_a, user_b],
        )?;
        Ok(deleted > 0)
    }

    fn list_friend_ids(&self, user_id: usize) -> Result<Vec<usize>> {
        self.query_ids(
            &format!(
                "SELECT friend_id FROM {} WHERE user_id = ?1 ORDER BY created",
                FRIENDSHIP_TABLE.name
            ),
            user_id,
        )
    }

    fn add_family_request(&self, request: &FamilyRequest) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (parent_id, child_id, initiator_id, created) VALUES (?1, ?2, ?3, ?4)",
                FAMILY_REQUEST_TABLE.name
            ),
            params![
                request.parent_id,
                request.child_id,
                request.initiator_id,
                request.created
            ],
        )
        .with_context(|| {
            format!(
                "Failed to store family request {} / {}",
                request.parent_id, request.child_id
            )
        })?;
        Ok(())
    }

    fn get_family_request(
        &self,
        parent_id: usize,
        child_id: usize,
    ) -> Result<Option<FamilyRequest>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT parent_id, child_id, initiator_id, created FROM {} WHERE parent_id = ?1 AND child_id = ?2",
                    FAMILY_REQUEST_TABLE.name
                ),
                params![parent_id, child_id],
                |row| {
                    Ok(FamilyRequest {
                        parent_id: row.get(0)?,
                        child_id: row.get(1)?,
                        initiator_id: row.get(2)?,
                        created: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn delete_family_request(&self, parent_id: usize, child_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE parent_id = ?1 AND child_id = ?2",
                FAMILY_REQUEST_TABLE.name
            ),
            params![parent_id, child_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_family_requests(&self, user_id: usize) -> Result<Vec<FamilyRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT parent_id, child_id, initiator_id, created FROM {} WHERE parent_id = ?1 OR child_id = ?1 ORDER BY created DESC",
            FAMILY_REQUEST_TABLE.name
        ))?;
        let requests = stmt
            .query_map(params![user_id], |row| {
                Ok(FamilyRequest {
                    parent_id: row.get(0)?,
                    child_id: row.get(1)?,
                    initiator_id: row.get(2)?,
                    created: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    fn accept_family_request(&self, parent_id: usize, child_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE parent_id = ?1 AND child_id = ?2",
                FAMILY_REQUEST_TABLE.name
            ),
            params![parent_id, child_id],
        )?;
        if deleted == 0 {
            return Ok(false);
        }
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (parent_id, child_id, created) VALUES (?1, ?2, ?3)",
                FAMILY_LINK_TABLE.name
            ),
            params![parent_id, child_id, now_secs()],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn is_family_linked(&self, parent_id: usize, child_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE parent_id = ?1 AND child_id = ?2",
                FAMILY_LINK_TABLE.name
            ),
            params![parent_id, child_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn delete_family_link(&self, parent_id: usize, child_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE parent_id = ?1 AND child_id = ?2",
                FAMILY_LINK_TABLE.name
            ),
            params![parent_id, child_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_children(&self, parent_id: usize) -> Result<Vec<usize>> {
        self.query_ids(
            &format!(
                "SELECT child_id FROM {} WHERE parent_id = ?1 ORDER BY created",
                FAMILY_LINK_TABLE.name
            ),
            parent_id,
        )
    }

    fn list_parents(&self, child_id: usize) -> Result<Vec<usize>> {
        self.query_ids(
            &format!(
                "SELECT parent_id FROM {} WHERE child_id = ?1 ORDER BY created",
                FAMILY_LINK_TABLE.name
            ),
            child_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{NewUser, UserRole, UserStore};
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap();
        for (handle, role) in [
            ("alice", UserRole::Student),
            ("bob", UserRole::Student),
            ("pam", UserRole::Parent),
            ("kim", UserRole::Child),
        ] {
            store.create_user(&NewUser::with_role(handle, role)).unwrap();
        }
        (store, temp_dir)
    }

    #[test]
    fn accepting_friend_request_creates_symmetric_friendship() {
        let (store, _dir) = create_tmp_store();
        store.add_friend_request(1, 2).unwrap();
        assert!(store.add_friend_request(1, 2).is_err());
        assert_eq!(store.list_incoming_friend_requests(2).unwrap().len(), 1);
        assert_eq!(store.list_outgoing_friend_requests(1).unwrap().len(), 1);

        assert!(store.accept_friend_request(1, 2).unwrap());
        assert!(store.are_friends(1, 2).unwrap());
        assert!(store.are_friends(2, 1).unwrap());
        assert!(store.get_friend_request(1, 2).unwrap().is_none());
        assert_eq!(store.list_friend_ids(2).unwrap(), vec![1]);

        assert!(store.remove_friendship(2, 1).unwrap());
        assert!(!store.are_friends(1, 2).unwrap());
        assert!(store.list_friend_ids(1).unwrap().is_empty());
    }

    #[test]
    fn accepting_without_pending_request_changes_nothing() {
        let (store, _dir) = create_tmp_store();
        assert!(!store.accept_friend_request(1, 2).unwrap());
        assert!(!store.are_friends(1, 2).unwrap());

        assert!(!store.accept_family_request(3, 4).unwrap());
        assert!(!store.is_family_linked(3, 4).unwrap());
    }

    #[test]
    fn family_request_lifecycle() {
        let (store, _dir) = create_tmp_store();
        let request = FamilyRequest {
            parent_id: 3,
            child_id: 4,
            initiator_id: 4,
            created: now_secs(),
        };
        store.add_family_request(&request).unwrap();
        assert_eq!(
            store.get_family_request(3, 4).unwrap().unwrap().initiator_id,
            4
        );
        assert_eq!(store.list_family_requests(3).unwrap().len(), 1);
        assert_eq!(store.list_family_requests(4).unwrap().len(), 1);
        assert!(store.list_family_requests(1).unwrap().is_empty());

        assert!(store.accept_family_request(3, 4).unwrap());
        assert!(store.is_family_linked(3, 4).unwrap());
        assert_eq!(store.list_children(3).unwrap(), vec![4]);
        assert_eq!(store.list_parents(4).unwrap(), vec![3]);
        assert!(store.get_family_request(3, 4).unwrap().is_none());

        assert!(store.delete_family_link(3, 4).unwrap());
        assert!(!store.delete_family_link(3, 4).unwrap());
    }
}
