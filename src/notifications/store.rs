//! Notification storage trait

use anyhow::Result;

use super::models::{Notification, NotificationType};

/// Trait for notification storage operations
pub trait NotificationStore: Send + Sync {
    /// Appends a notification for `recipient_id`.
    /// Returns the created notification with its ID and timestamp set.
    fn create_notification(
        &self,
        recipient_id: usize,
        sender_id: Option<usize>,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<Notification>;

    /// Get all notifications for a user, newest first.
    fn get_user_notifications(&self, user_id: usize) -> Result<Vec<Notification>>;

    /// Get a single notification by ID (verifies ownership).
    fn get_notification(&self, notification_id: &str, user_id: usize)
        -> Result<Option<Notification>>;

    /// Mark a notification as read. Returns the updated notification.
    /// Returns None if notification doesn't exist or doesn't belong to user.
    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: usize,
    ) -> Result<Option<Notification>>;

    /// Marks every notification of the user as read, returning how many changed.
    fn mark_all_notifications_read(&self, user_id: usize) -> Result<usize>;

    /// Get count of unread notifications for a user.
    fn get_unread_count(&self, user_id: usize) -> Result<usize>;
}
