use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use ll_domain::interaction::NewInteraction;

use super::extract::ApiJson;
use super::{api_error, internal_error};
use crate::state::AppState;

/// POST /v1/interactions
///
/// Stores the interaction, then charges its tokens to the agent's limits.
/// Accounting problems are logged and never fail the request.
pub async fn record_interaction(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewInteraction>,
) -> Response {
    if req.agent_id.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "agent_id must not be empty");
    }

    let interaction = match state.interactions.record(req).await {
        Ok(i) => i,
        Err(e) => return internal_error("recording interaction failed", e),
    };

    state.tracker.record_interaction_usage(&interaction).await;

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "interaction": interaction })),
    )
        .into_response()
}
