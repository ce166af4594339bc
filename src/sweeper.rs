use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{EXPIRATION_WINDOW_HOURS, EXPIRED_NOTIFICATION_TITLE, EXPIRY_REASON};
use crate::store::operations::bookings::Booking;
use crate::store::operations::notifications::{Notification, NotificationType};
use crate::store::{Store, StoreError};

/// Storage surface the sweep needs. The production [`Store`] implements it
/// directly; tests substitute doubles to inject failures between stages.
pub trait SweepStore {
    fn stale_pending_bookings(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    fn expire_bookings(&self, booking_ids: &[String], reason: &str)
        -> Result<Vec<String>, StoreError>;

    fn batch_create_notifications(&self, notifications: &[Notification])
        -> Result<(), StoreError>;
}

impl SweepStore for Store {
    fn stale_pending_bookings(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        Store::stale_pending_bookings(self, cutoff)
    }

    fn expire_bookings(
        &self,
        booking_ids: &[String],
        reason: &str,
    ) -> Result<Vec<String>, StoreError> {
        Store::expire_bookings(self, booking_ids, reason)
    }

    fn batch_create_notifications(
        &self,
        notifications: &[Notification],
    ) -> Result<(), StoreError> {
        Store::batch_create_notifications(self, notifications)
    }
}

/// Which stage of the sweep failed. The booking update and the notification
/// fan-out commit separately, so a `Notification` error means bookings were
/// already flipped; the next sweep will not re-notify them because they are
/// no longer Pending.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("{0}")]
    Selection(StoreError),
    #[error("{0}")]
    Update(StoreError),
    #[error("{0}")]
    Notification(StoreError),
}

impl SweepError {
    pub fn stage(&self) -> &'static str {
        match self {
            SweepError::Selection(_) => "selection",
            SweepError::Update(_) => "update",
            SweepError::Notification(_) => "notification",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub count: usize,
    pub message: String,
}

impl SweepSummary {
    fn empty() -> Self {
        Self {
            count: 0,
            message: "No expired bookings found".to_string(),
        }
    }

    fn processed(count: usize) -> Self {
        Self {
            count,
            message: format!("Processed {count} expired bookings"),
        }
    }
}

/// One pass of the expiration sweep.
///
/// Selects Pending bookings older than the expiration window, flips them to
/// Expired in a single atomic update, then fans one notification out to each
/// affected customer in a second atomic batch. Only bookings the update
/// actually flipped are counted and notified, so concurrent sweeps cannot
/// notify a customer twice.
pub fn sweep(store: &impl SweepStore) -> Result<SweepSummary, SweepError> {
    let cutoff = Utc::now() - Duration::hours(EXPIRATION_WINDOW_HOURS);

    let stale = store
        .stale_pending_bookings(cutoff)
        .map_err(SweepError::Selection)?;
    if stale.is_empty() {
        tracing::info!("No expired bookings found");
        return Ok(SweepSummary::empty());
    }

    let stale_ids: Vec<String> = stale.iter().map(|b| b.id.clone()).collect();
    let flipped = store
        .expire_bookings(&stale_ids, EXPIRY_REASON)
        .map_err(SweepError::Update)?;
    tracing::info!(count = flipped.len(), "Updated expired bookings");

    if flipped.is_empty() {
        return Ok(SweepSummary::processed(0));
    }

    let flipped_set: HashSet<&str> = flipped.iter().map(String::as_str).collect();
    let notifications: Vec<Notification> = stale
        .iter()
        .filter(|b| flipped_set.contains(b.id.as_str()))
        .map(expiry_notification)
        .collect();

    store
        .batch_create_notifications(&notifications)
        .map_err(SweepError::Notification)?;
    tracing::info!(count = notifications.len(), "Created customer notifications");

    Ok(SweepSummary::processed(flipped.len()))
}

fn expiry_notification(booking: &Booking) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        user_id: booking.customer_id.clone(),
        notification_type: NotificationType::BookingExpired,
        title: EXPIRED_NOTIFICATION_TITLE.to_string(),
        message: format!(
            "Your {} booking has expired because no service provider responded in time.",
            booking.service_name
        ),
        booking_id: Some(booking.id.clone()),
        read: false,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tempfile::tempdir;

    use crate::store::operations::bookings::BookingStatus;

    use super::*;

    fn open_store(name: &str) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        let store = Store::open(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn booking(id: &str, customer: &str, service: &str, status: BookingStatus, age_hours: i64) -> Booking {
        Booking {
            id: id.to_string(),
            customer_id: customer.to_string(),
            service_name: service.to_string(),
            status,
            created_at: Utc::now() - Duration::hours(age_hours),
            expiry_reason: None,
        }
    }

    #[test]
    fn expires_only_bookings_past_the_window() {
        let (_dir, store) = open_store("sweep-db");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();
        store
            .create_booking(&booking("B2", "u2", "Massage", BookingStatus::Pending, 1))
            .unwrap();

        let summary = sweep(&store).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.message, "Processed 1 expired bookings");

        let b1 = store.get_booking("B1").unwrap().unwrap();
        assert_eq!(b1.status, BookingStatus::Expired);
        assert_eq!(b1.expiry_reason.as_deref(), Some(EXPIRY_REASON));

        let b2 = store.get_booking("B2").unwrap().unwrap();
        assert_eq!(b2.status, BookingStatus::Pending);
        assert!(b2.expiry_reason.is_none());

        let notifications = store.list_notifications("u1", 10, false).unwrap();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0];
        assert_eq!(n.title, EXPIRED_NOTIFICATION_TITLE);
        assert_eq!(n.notification_type, NotificationType::BookingExpired);
        assert_eq!(n.booking_id.as_deref(), Some("B1"));
        assert!(!n.read);
        assert_eq!(
            n.message,
            "Your Haircut booking has expired because no service provider responded in time."
        );
        assert!(store.list_notifications("u2", 10, false).unwrap().is_empty());
    }

    #[test]
    fn empty_store_reports_nothing_found() {
        let (_dir, store) = open_store("sweep-db2");

        let summary = sweep(&store).unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.message, "No expired bookings found");
    }

    #[test]
    fn old_non_pending_bookings_are_untouched() {
        let (_dir, store) = open_store("sweep-db3");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Confirmed, 48))
            .unwrap();
        store
            .create_booking(&booking("B2", "u1", "Massage", BookingStatus::Cancelled, 48))
            .unwrap();

        let summary = sweep(&store).unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.message, "No expired bookings found");

        let b1 = store.get_booking("B1").unwrap().unwrap();
        assert_eq!(b1.status, BookingStatus::Confirmed);
        assert!(store.list_notifications("u1", 10, false).unwrap().is_empty());
    }

    #[test]
    fn second_sweep_is_a_no_op() {
        let (_dir, store) = open_store("sweep-db4");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();

        let first = sweep(&store).unwrap();
        assert_eq!(first.count, 1);

        let second = sweep(&store).unwrap();
        assert_eq!(second.count, 0);
        assert_eq!(second.message, "No expired bookings found");

        // No duplicate notification for the same booking.
        assert_eq!(store.list_notifications("u1", 10, false).unwrap().len(), 1);
    }

    #[test]
    fn each_stale_booking_notifies_its_own_customer() {
        let (_dir, store) = open_store("sweep-db5");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();
        store
            .create_booking(&booking("B2", "u2", "Plumbing", BookingStatus::Pending, 20))
            .unwrap();
        store
            .create_booking(&booking("B3", "u1", "Massage", BookingStatus::Pending, 15))
            .unwrap();

        let summary = sweep(&store).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.message, "Processed 3 expired bookings");

        assert_eq!(store.list_notifications("u1", 10, false).unwrap().len(), 2);
        assert_eq!(store.list_notifications("u2", 10, false).unwrap().len(), 1);
    }

    /// Double that reports a stale snapshot of its own choosing but delegates
    /// writes to a real store. Models a concurrent writer changing a booking
    /// between selection and update.
    struct StaleSnapshot<'a> {
        inner: &'a Store,
        snapshot: Vec<Booking>,
    }

    impl SweepStore for StaleSnapshot<'_> {
        fn stale_pending_bookings(
            &self,
            _cutoff: DateTime<Utc>,
        ) -> Result<Vec<Booking>, StoreError> {
            Ok(self.snapshot.clone())
        }

        fn expire_bookings(
            &self,
            booking_ids: &[String],
            reason: &str,
        ) -> Result<Vec<String>, StoreError> {
            self.inner.expire_bookings(booking_ids, reason)
        }

        fn batch_create_notifications(
            &self,
            notifications: &[Notification],
        ) -> Result<(), StoreError> {
            self.inner.batch_create_notifications(notifications)
        }
    }

    #[test]
    fn bookings_flipped_elsewhere_are_not_counted_or_notified() {
        let (_dir, store) = open_store("sweep-db6");

        // B2 was Confirmed after the (simulated) selection ran.
        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();
        store
            .create_booking(&booking("B2", "u2", "Massage", BookingStatus::Confirmed, 13))
            .unwrap();

        let double = StaleSnapshot {
            inner: &store,
            snapshot: vec![
                booking("B1", "u1", "Haircut", BookingStatus::Pending, 13),
                booking("B2", "u2", "Massage", BookingStatus::Pending, 13),
            ],
        };

        let summary = sweep(&double).unwrap();
        assert_eq!(summary.count, 1);

        assert_eq!(
            store.get_booking("B2").unwrap().unwrap().status,
            BookingStatus::Confirmed
        );
        assert_eq!(store.list_notifications("u1", 10, false).unwrap().len(), 1);
        assert!(store.list_notifications("u2", 10, false).unwrap().is_empty());
    }

    /// Double that fails a chosen stage and delegates the rest.
    struct FailingStage<'a> {
        inner: &'a Store,
        fail_selection: bool,
        fail_update: bool,
        fail_notification: bool,
    }

    impl<'a> FailingStage<'a> {
        fn new(inner: &'a Store) -> Self {
            Self {
                inner,
                fail_selection: false,
                fail_update: false,
                fail_notification: false,
            }
        }

        fn injected() -> StoreError {
            StoreError::Validation("injected failure".to_string())
        }
    }

    impl SweepStore for FailingStage<'_> {
        fn stale_pending_bookings(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Booking>, StoreError> {
            if self.fail_selection {
                return Err(Self::injected());
            }
            self.inner.stale_pending_bookings(cutoff)
        }

        fn expire_bookings(
            &self,
            booking_ids: &[String],
            reason: &str,
        ) -> Result<Vec<String>, StoreError> {
            if self.fail_update {
                return Err(Self::injected());
            }
            self.inner.expire_bookings(booking_ids, reason)
        }

        fn batch_create_notifications(
            &self,
            notifications: &[Notification],
        ) -> Result<(), StoreError> {
            if self.fail_notification {
                return Err(Self::injected());
            }
            self.inner.batch_create_notifications(notifications)
        }
    }

    #[test]
    fn selection_failure_changes_nothing() {
        let (_dir, store) = open_store("sweep-db7");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();

        let mut double = FailingStage::new(&store);
        double.fail_selection = true;

        let err = sweep(&double).unwrap_err();
        assert_eq!(err.stage(), "selection");
        assert!(matches!(err, SweepError::Selection(_)));

        assert_eq!(
            store.get_booking("B1").unwrap().unwrap().status,
            BookingStatus::Pending
        );
    }

    #[test]
    fn update_failure_leaves_bookings_pending() {
        let (_dir, store) = open_store("sweep-db8");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();

        let mut double = FailingStage::new(&store);
        double.fail_update = true;

        let err = sweep(&double).unwrap_err();
        assert_eq!(err.stage(), "update");

        assert_eq!(
            store.get_booking("B1").unwrap().unwrap().status,
            BookingStatus::Pending
        );
        assert!(store.list_notifications("u1", 10, false).unwrap().is_empty());
    }

    #[test]
    fn notification_failure_still_expires_bookings() {
        let (_dir, store) = open_store("sweep-db9");

        store
            .create_booking(&booking("B1", "u1", "Haircut", BookingStatus::Pending, 13))
            .unwrap();

        let mut double = FailingStage::new(&store);
        double.fail_notification = true;

        let err = sweep(&double).unwrap_err();
        assert_eq!(err.stage(), "notification");
        assert!(err.to_string().contains("injected failure"));

        // The update commit already happened; the notification batch did not.
        assert_eq!(
            store.get_booking("B1").unwrap().unwrap().status,
            BookingStatus::Expired
        );
        assert!(store.list_notifications("u1", 10, false).unwrap().is_empty());
    }

    #[test]
    fn summary_serializes_count_and_message() {
        let json = serde_json::to_value(SweepSummary::processed(2)).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["message"], "Processed 2 expired bookings");
    }
}
