//! Usage read-back and call-count recording.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use ll_domain::limit::LimitEntityType;

use super::api_error;
use super::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// GET /v1/agents/:id/token-usage
pub async fn agent_token_usage(
    State(state): State<AppState>,
    ApiPath(agent_id): ApiPath<String>,
) -> Response {
    let usage = state.interactions.token_usage(&agent_id).await;
    Json(usage).into_response()
}

#[derive(Debug, Deserialize)]
pub struct McpCallRequest {
    pub entity_type: LimitEntityType,
    pub entity_id: String,
    pub mcp_server_name: String,
}

/// POST /v1/usage/mcp-calls
pub async fn record_mcp_call(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<McpCallRequest>,
) -> Response {
    if req.entity_id.trim().is_empty() || req.mcp_server_name.trim().is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "entity_id and mcp_server_name are required",
        );
    }

    state
        .tracker
        .record_mcp_server_call(req.entity_type, &req.entity_id, &req.mcp_server_name)
        .await;

    accepted()
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub entity_type: LimitEntityType,
    pub entity_id: String,
    pub mcp_server_name: String,
    pub tool_name: String,
}

/// POST /v1/usage/tool-calls
pub async fn record_tool_call(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ToolCallRequest>,
) -> Response {
    if req.entity_id.trim().is_empty()
        || req.mcp_server_name.trim().is_empty()
        || req.tool_name.trim().is_empty()
    {
        return api_error(
            StatusCode::BAD_REQUEST,
            "entity_id, mcp_server_name and tool_name are required",
        );
    }

    state
        .tracker
        .record_tool_call(
            req.entity_type,
            &req.entity_id,
            &req.mcp_server_name,
            &req.tool_name,
        )
        .await;

    accepted()
}

fn accepted() -> Response {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "recorded": true })),
    )
        .into_response()
}
