//! Fire-and-forget notification dispatch

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::server::metrics;
use crate::user::FullUserStore;

use super::models::{Notification, NotificationType};

/// Writes notifications on behalf of the managers.
///
/// A failed write is logged and swallowed: the action that triggered the
/// notification has already happened and must not be reported as failed.
#[derive(Clone)]
pub struct Notifier {
    user_store: Arc<dyn FullUserStore>,
}

impl Notifier {
    pub fn new(user_store: Arc<dyn FullUserStore>) -> Self {
        Self { user_store }
    }

    pub fn notify(
        &self,
        recipient_id: usize,
        sender_id: Option<usize>,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) {
        if sender_id == Some(recipient_id) {
            return;
        }
        match self.user_store.create_notification(
            recipient_id,
            sender_id,
            notification_type,
            payload,
        ) {
            Ok(notification) => {
                metrics::record_notification_sent(notification_type.as_str());
                debug!(
                    "Notified user {} ({})",
                    recipient_id, notification.notification_type.as_str()
                );
            }
            Err(err) => {
                warn!(
                    "Failed to store {} notification for user {}: {}",
                    notification_type.as_str(),
                    recipient_id,
                    err
                );
            }
        }
    }

    pub fn list(&self, user_id: usize) -> ServiceResult<Vec<Notification>> {
        Ok(self.user_store.get_user_notifications(user_id)?)
    }

    pub fn unread_count(&self, user_id: usize) -> ServiceResult<usize> {
        Ok(self.user_store.get_unread_count(user_id)?)
    }

    /// Idempotent; someone else's notification is reported as missing.
    pub fn mark_read(&self, user_id: usize, notification_id: &str) -> ServiceResult<Notification> {
        self.user_store
            .mark_notification_read(notification_id, user_id)?
            .ok_or(ServiceError::NotFound("Notification"))
    }

    pub fn mark_all_read(&self, user_id: usize) -> ServiceResult<usize> {
        Ok(self.user_store.mark_all_notifications_read(user_id)?)
    }
}
