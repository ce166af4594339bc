use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::bookings::{Booking, BookingStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    customer_id: String,
    service_name: String,
}

async fn create_booking(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateBookingRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer_id: req.customer_id.trim().to_string(),
        service_name: req.service_name.trim().to_string(),
        status: BookingStatus::Pending,
        created_at: Utc::now(),
        expiry_reason: None,
    };

    state.store().create_booking(&booking)?;
    Ok(created(booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingQuery {
    customer_id: Option<String>,
    limit: Option<usize>,
}

async fn list_bookings(
    Query(q): Query<BookingQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let bookings = state.store().list_bookings(q.customer_id.as_deref(), limit)?;
    Ok(ok(bookings))
}

async fn get_booking(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    match state.store().get_booking(&id)? {
        Some(booking) => Ok(ok(booking)),
        None => Err(AppError::not_found("Booking not found")),
    }
}
