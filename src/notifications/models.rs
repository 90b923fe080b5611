//! Notification data models

use serde::{Deserialize, Serialize};

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    FriendRequest,
    FriendAccepted,
    FriendRejected,
    FamilyRequest,
    FamilyAccepted,
    FamilyRejected,
    AccountBlocked,
    AccountUnblocked,
    RoleChanged,
    PostComment,
    PostShared,
    ListingApproved,
    ListingRejected,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::FriendRequest => "friend_request",
            NotificationType::FriendAccepted => "friend_accepted",
            NotificationType::FriendRejected => "friend_rejected",
            NotificationType::FamilyRequest => "family_request",
            NotificationType::FamilyAccepted => "family_accepted",
            NotificationType::FamilyRejected => "family_rejected",
            NotificationType::AccountBlocked => "account_blocked",
            NotificationType::AccountUnblocked => "account_unblocked",
            NotificationType::RoleChanged => "role_changed",
            NotificationType::PostComment => "post_comment",
            NotificationType::PostShared => "post_shared",
            NotificationType::ListingApproved => "listing_approved",
            NotificationType::ListingRejected => "listing_rejected",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }
}

/// A user notification. Rows are append-only; only `is_read` ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: usize,
    pub sender_id: Option<usize>,
    pub notification_type: NotificationType,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_serialization() {
        let serialized = serde_json::to_string(&NotificationType::FamilyAccepted).unwrap();
        assert_eq!(serialized, "\"family_accepted\"");

        let deserialized: NotificationType = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, NotificationType::FamilyAccepted);
    }

    #[test]
    fn as_str_matches_serde_name() {
        for t in [
            NotificationType::FriendRequest,
            NotificationType::AccountUnblocked,
            NotificationType::PostShared,
            NotificationType::ListingRejected,
        ] {
            assert_eq!(NotificationType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(NotificationType::from_str("download_completed"), None);
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let notification = Notification {
            id: "notif-123".to_string(),
            recipient_id: 4,
            sender_id: Some(7),
            notification_type: NotificationType::PostComment,
            payload: serde_json::json!({ "postId": "p1" }),
            is_read: false,
            created_at: 1700000000,
        };

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["recipientId"], 4);
        assert_eq!(value["senderId"], 7);
        assert_eq!(value["notificationType"], "post_comment");
        assert_eq!(value["isRead"], false);
        assert_eq!(value["createdAt"], 1700000000);
    }
}
