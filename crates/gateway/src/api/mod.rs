pub mod extract;
pub mod health;
pub mod interactions;
pub mod limits;
pub mod pricing;
pub mod usage;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Limits
        .route("/v1/limits", get(limits::list_limits).post(limits::create_limit))
        .route("/v1/limits/validation", get(limits::validation_lookup))
        .route(
            "/v1/limits/:id",
            get(limits::get_limit)
                .patch(limits::patch_limit)
                .delete(limits::delete_limit),
        )
        .route("/v1/limits/:id/reset", post(limits::reset_limit))
        // Interactions & usage
        .route("/v1/interactions", post(interactions::record_interaction))
        .route("/v1/agents/:id/token-usage", get(usage::agent_token_usage))
        .route("/v1/usage/mcp-calls", post(usage::record_mcp_call))
        .route("/v1/usage/tool-calls", post(usage::record_tool_call))
        // Pricing
        .route("/v1/pricing", get(pricing::list_pricing))
}

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Log a storage failure and answer 500.
pub(crate) fn internal_error(context: &str, error: impl std::fmt::Display) -> Response {
    tracing::error!(error = %error, "{context}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {error}"))
}
