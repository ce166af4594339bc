pub const BOOKINGS: &str = "bookings";
pub const NOTIFICATIONS: &str = "notifications";
pub const META: &str = "meta";
