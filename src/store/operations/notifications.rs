use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingExpired,
    BookingConfirmed,
    BookingCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub booking_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Write a group of notifications in one atomic batch. Either every entry
    /// becomes visible or none does.
    pub fn batch_create_notifications(
        &self,
        notifications: &[Notification],
    ) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for notification in notifications {
            let key = keys::notification_key(&notification.user_id, &notification.id);
            let bytes = Self::serialize(notification)?;
            batch.insert(key.as_bytes(), bytes);
        }
        self.notifications.apply_batch(batch)?;
        Ok(())
    }

    pub fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StoreError> {
        let prefix = keys::notification_prefix(user_id);
        let mut notifications = Vec::new();

        for item in self.notifications.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = match item {
                Ok(kv) => kv,
                Err(_) => continue,
            };
            if let Ok(notification) = Self::deserialize::<Notification>(&raw) {
                if unread_only && notification.read {
                    continue;
                }
                notifications.push(notification);
            }
        }

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    pub fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<Option<Notification>, StoreError> {
        let key = keys::notification_key(user_id, notification_id);
        let Some(raw) = self.notifications.get(key.as_bytes())? else {
            return Ok(None);
        };

        let mut notification: Notification = Self::deserialize(&raw)?;
        notification.read = true;
        self.notifications
            .insert(key.as_bytes(), Self::serialize(&notification)?)?;
        Ok(Some(notification))
    }

    pub fn count_unread_notifications(&self, user_id: &str) -> Result<u64, StoreError> {
        let prefix = keys::notification_prefix(user_id);
        let mut unread_count = 0u64;

        for item in self.notifications.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = match item {
                Ok(kv) => kv,
                Err(_) => continue,
            };
            if let Ok(notification) = Self::deserialize::<Notification>(&raw) {
                if !notification.read {
                    unread_count += 1;
                }
            }
        }

        Ok(unread_count)
    }
}
