/// Pending bookings older than this are considered abandoned by the provider
/// and get expired by the sweeper.
pub const EXPIRATION_WINDOW_HOURS: i64 = 12;

/// Reason written onto a booking when the sweeper expires it.
pub const EXPIRY_REASON: &str = "Provider did not respond within 12 hours";

/// Title of the notification sent to the customer of an expired booking.
pub const EXPIRED_NOTIFICATION_TITLE: &str = "Booking Expired";

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: usize = 100;

/// Maximum accepted length for customer identifiers.
pub const MAX_CUSTOMER_ID_LEN: usize = 64;

/// Maximum accepted length for service display names.
pub const MAX_SERVICE_NAME_LEN: usize = 200;
