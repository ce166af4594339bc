use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::constants::{MAX_CUSTOMER_ID_LEN, MAX_SERVICE_NAME_LEN};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Status values are written capitalized ("Pending", "Expired", ...) so they
/// stay readable in raw tree dumps. The sweeper only ever performs the
/// Pending -> Expired transition; every other value is produced elsewhere and
/// merely filtered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub service_name: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expiry_reason: Option<String>,
}

/// The customer id doubles as the notification key prefix, so it must stay
/// non-empty and free of the `:` separator.
fn validate_booking(booking: &Booking) -> Result<(), StoreError> {
    if booking.id.trim().is_empty() {
        return Err(StoreError::Validation("booking id must not be empty".into()));
    }
    if booking.customer_id.trim().is_empty() {
        return Err(StoreError::Validation("customerId must not be empty".into()));
    }
    if booking.customer_id.contains(':') {
        return Err(StoreError::Validation("customerId must not contain ':'".into()));
    }
    if booking.customer_id.len() > MAX_CUSTOMER_ID_LEN {
        return Err(StoreError::Validation(format!(
            "customerId must be at most {MAX_CUSTOMER_ID_LEN} characters"
        )));
    }
    if booking.service_name.trim().is_empty() {
        return Err(StoreError::Validation("serviceName must not be empty".into()));
    }
    if booking.service_name.len() > MAX_SERVICE_NAME_LEN {
        return Err(StoreError::Validation(format!(
            "serviceName must be at most {MAX_SERVICE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

impl Store {
    pub fn create_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        validate_booking(booking)?;

        let key = keys::booking_key(&booking.id);
        let bytes = Self::serialize(booking)?;

        // Insert-if-absent so two writers racing on the same id cannot
        // silently overwrite one another.
        let cas_result = self
            .bookings
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(bytes))
            .map_err(StoreError::Sled)?;

        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "booking".to_string(),
                key: booking.id.clone(),
            });
        }

        Ok(())
    }

    pub fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        let key = keys::booking_key(booking_id);
        match self.bookings.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_bookings(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut bookings = Vec::new();

        for item in self.bookings.iter() {
            let (_, raw) = match item {
                Ok(kv) => kv,
                Err(_) => continue,
            };
            if let Ok(booking) = Self::deserialize::<Booking>(&raw) {
                if let Some(customer_id) = customer_id {
                    if booking.customer_id != customer_id {
                        continue;
                    }
                }
                bookings.push(booking);
            }
        }

        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings.truncate(limit);
        Ok(bookings)
    }

    /// Full scan for bookings still Pending whose `created_at` is strictly
    /// older than `cutoff`, oldest first. Unreadable documents fail the scan
    /// rather than being skipped: the sweeper must not expire around them.
    pub fn stale_pending_bookings(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut stale = Vec::new();

        for item in self.bookings.iter() {
            let (_, raw) = item?;
            let booking: Booking = Self::deserialize(&raw)?;
            if booking.status == BookingStatus::Pending && booking.created_at < cutoff {
                stale.push(booking);
            }
        }

        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(stale)
    }

    /// Flip the given bookings to Expired in one all-or-nothing transaction,
    /// touching only `status` and `expiry_reason`.
    ///
    /// Each booking is re-read inside the transaction and skipped unless its
    /// status is still Pending, so a concurrent sweep that already expired it
    /// cannot be double-counted. Returns the ids actually flipped.
    pub fn expire_bookings(
        &self,
        booking_ids: &[String],
        reason: &str,
    ) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = booking_ids.to_vec();
        let reason = reason.to_string();

        let flipped = self
            .bookings
            .transaction(move |tx| {
                let mut flipped = Vec::with_capacity(ids.len());
                for booking_id in &ids {
                    let key = keys::booking_key(booking_id);
                    let Some(raw) = tx.get(key.as_bytes())? else {
                        continue;
                    };
                    let mut booking: Booking = serde_json::from_slice(&raw)
                        .map_err(ConflictableTransactionError::Abort)?;
                    if booking.status != BookingStatus::Pending {
                        continue;
                    }
                    booking.status = BookingStatus::Expired;
                    booking.expiry_reason = Some(reason.clone());
                    let bytes = serde_json::to_vec(&booking)
                        .map_err(ConflictableTransactionError::Abort)?;
                    tx.insert(key.as_bytes(), bytes)?;
                    flipped.push(booking_id.clone());
                }
                Ok(flipped)
            })
            .map_err(|e: TransactionError<serde_json::Error>| match e {
                TransactionError::Abort(serde_err) => StoreError::Serialization(serde_err),
                TransactionError::Storage(se) => StoreError::Sled(se),
            })?;

        Ok(flipped)
    }
}
