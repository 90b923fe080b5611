//! `NotificationStore` backed by the `notification` table of `user.db`.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::models::{Notification, NotificationType};
use super::store::NotificationStore;
use crate::sqlite_persistence::{new_entity_id, now_secs};
use crate::user::{SqliteUserStore, NOTIFICATION_TABLE};

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, sender_id, notification_type, payload, is_read, created_at";

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    let type_name: String = row.get(3)?;
    let notification_type = NotificationType::from_str(&type_name).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("Unknown notification type {}", type_name).into(),
        )
    })?;
    let payload: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        sender_id: row.get(2)?,
        notification_type,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl NotificationStore for SqliteUserStore {
    fn create_notification(
        &self,
        recipient_id: usize,
        sender_id: Option<usize>,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<Notification> {
        let notification = Notification {
            id: new_entity_id(),
            recipient_id,
            sender_id,
            notification_type,
            payload,
            is_read: false,
            created_at: now_secs(),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                NOTIFICATION_TABLE.name, NOTIFICATION_COLUMNS
            ),
            params![
                notification.id,
                notification.recipient_id,
                notification.sender_id,
                notification.notification_type.as_str(),
                notification.payload.to_string(),
                notification.is_read,
                notification.created_at,
            ],
        )
        .with_context(|| format!("Failed to store notification for user {}", recipient_id))?;
        debug!(
            "Stored {} notification {} for user {}",
            notification_type.as_str(),
            notification.id,
            recipient_id
        );
        Ok(notification)
    }

    fn get_user_notifications(&self, user_id: usize) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE recipient_id = ?1 ORDER BY created_at DESC, rowid DESC",
            NOTIFICATION_COLUMNS, NOTIFICATION_TABLE.name
        ))?;
        let notifications = stmt
            .query_map(params![user_id], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    fn get_notification(
        &self,
        notification_id: &str,
        user_id: usize,
    ) -> Result<Option<Notification>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1 AND recipient_id = ?2",
                    NOTIFICATION_COLUMNS, NOTIFICATION_TABLE.name
                ),
                params![notification_id, user_id],
                notification_from_row,
            )
            .optional()?)
    }

    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: usize,
    ) -> Result<Option<Notification>> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                &format!(
                    "UPDATE {} SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                    NOTIFICATION_TABLE.name
                ),
                params![notification_id, user_id],
            )?;
        }
        self.get_notification(notification_id, user_id)
    }

    fn mark_all_notifications_read(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "UPDATE {} SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
                NOTIFICATION_TABLE.name
            ),
            params![user_id],
        )?)
    }

    fn get_unread_count(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE recipient_id = ?1 AND is_read = 0",
                NOTIFICATION_TABLE.name
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
