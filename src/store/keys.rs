pub fn booking_key(booking_id: &str) -> String {
    booking_id.to_string()
}

pub fn notification_key(user_id: &str, notification_id: &str) -> String {
    format!("{}:{}", user_id, notification_id)
}

pub fn notification_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}
