use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::state::AppState;
use crate::sweeper;

pub fn router() -> Router<AppState> {
    Router::new().route("/check-expired-bookings", post(check_expired_bookings))
}

/// Manual trigger for the expiration sweep, for external schedulers and
/// operators. The scheduled worker runs the same sweep.
async fn check_expired_bookings(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match sweeper::sweep(state.store()) {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "count": summary.count,
                "message": summary.message,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, stage = e.stage(), "Error checking expired bookings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}
