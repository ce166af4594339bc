pub mod bookings;
pub mod notifications;
