use chrono::{Duration, Utc};

use booking_backend::store::operations::bookings::{Booking, BookingStatus};
use booking_backend::store::operations::notifications::{Notification, NotificationType};
use booking_backend::store::Store;

pub fn seed_booking(
    store: &Store,
    customer_id: &str,
    service_name: &str,
    status: BookingStatus,
    age_hours: i64,
) -> Booking {
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        service_name: service_name.to_string(),
        status,
        created_at: Utc::now() - Duration::hours(age_hours),
        expiry_reason: None,
    };
    store.create_booking(&booking).expect("create seed booking");
    booking
}

pub fn seed_pending_booking(
    store: &Store,
    customer_id: &str,
    service_name: &str,
    age_hours: i64,
) -> Booking {
    seed_booking(store, customer_id, service_name, BookingStatus::Pending, age_hours)
}

pub fn seed_notification(store: &Store, user_id: &str, read: bool) -> Notification {
    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        notification_type: NotificationType::BookingExpired,
        title: "Booking Expired".to_string(),
        message: "Your Haircut booking has expired because no service provider responded in time."
            .to_string(),
        booking_id: None,
        read,
        created_at: Utc::now(),
    };
    store
        .batch_create_notifications(std::slice::from_ref(&notification))
        .expect("create seed notification");
    notification
}
