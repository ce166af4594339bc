use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(get_unread_count))
        .route("/:user_id/:id/read", put(mark_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationQuery {
    user_id: Option<String>,
    limit: Option<usize>,
    unread_only: Option<bool>,
}

fn require_user_id(query: &NotificationQuery) -> Result<&str, AppError> {
    match query.user_id.as_deref() {
        Some(user_id) if !user_id.trim().is_empty() => Ok(user_id),
        _ => Err(AppError::bad_request(
            "MISSING_USER_ID",
            "userId query parameter is required",
        )),
    }
}

async fn list_notifications(
    Query(q): Query<NotificationQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let user_id = require_user_id(&q)?;
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let unread_only = q.unread_only.unwrap_or(false);

    let notifications = state
        .store()
        .list_notifications(user_id, limit, unread_only)?;

    Ok(ok(notifications))
}

async fn get_unread_count(
    Query(q): Query<NotificationQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let user_id = require_user_id(&q)?;
    let unread_count = state.store().count_unread_notifications(user_id)?;
    Ok(ok(serde_json::json!({"unreadCount": unread_count})))
}

async fn mark_read(
    Path((user_id, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let notification = state.store().mark_notification_read(&user_id, &id)?;

    match notification {
        Some(notification) => Ok(ok(notification)),
        None => Err(AppError::not_found("Notification not found")),
    }
}
