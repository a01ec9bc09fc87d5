use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /v1/pricing`: known model prices, defaulted ones flagged.
pub async fn list_pricing(State(state): State<AppState>) -> impl IntoResponse {
    let prices = state.pricing.snapshot();
    let count = prices.len();
    Json(serde_json::json!({
        "prices": prices,
        "count": count,
    }))
}
