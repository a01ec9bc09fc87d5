//! Limit CRUD, reset and validation-lookup endpoints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use ll_domain::limit::{LimitEntityType, LimitFilter, LimitPatch, LimitType, NewLimit};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{api_error, internal_error};
use crate::state::AppState;

/// Header naming the caller's organization; its presence triggers the lazy
/// cleanup check before a listing.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

fn organization_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_limits(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<LimitFilter>,
) -> Response {
    if let Some(org) = organization_id(&headers) {
        if let Err(e) = state.cleanup.cleanup_if_needed(&org).await {
            return internal_error("limit cleanup failed", e);
        }
    }

    let models = state.interactions.models().await;
    state.pricing.ensure_models_priced(models);

    match state.limits.list(&filter).await {
        Ok(limits) => {
            let count = limits.len();
            Json(serde_json::json!({
                "limits": limits,
                "count": count,
            }))
            .into_response()
        }
        Err(e) => internal_error("listing limits failed", e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn create_limit(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewLimit>,
) -> Response {
    if let Err(e) = req.validate() {
        return api_error(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.limits.create(req).await {
        Ok(limit) => {
            tracing::info!(
                limit_id = %limit.id,
                entity_type = %limit.entity_type,
                entity_id = %limit.entity_id,
                limit_type = %limit.limit_type,
                "limit created"
            );
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "limit": limit })),
            )
                .into_response()
        }
        Err(e) => internal_error("creating limit failed", e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/limits/validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ValidationQuery {
    pub entity_type: LimitEntityType,
    pub entity_id: String,
    #[serde(default)]
    pub limit_type: LimitType,
}

/// Current counters and thresholds for one entity and kind.  The comparison
/// against `limit_value` belongs to whoever calls this.
pub async fn validation_lookup(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ValidationQuery>,
) -> Response {
    match state
        .limits
        .find_limits_for_validation(q.entity_type, &q.entity_id, q.limit_type)
        .await
    {
        Ok(limits) => {
            let count = limits.len();
            Json(serde_json::json!({
                "limits": limits,
                "count": count,
            }))
            .into_response()
        }
        Err(e) => internal_error("validation lookup failed", e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET / PATCH / DELETE /v1/limits/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_limit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Response {
    match state.limits.get(&id).await {
        Ok(Some(limit)) => Json(serde_json::json!({ "limit": limit })).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "limit not found"),
        Err(e) => internal_error("reading limit failed", e),
    }
}

pub async fn patch_limit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<LimitPatch>,
) -> Response {
    match state.limits.patch(&id, patch).await {
        Ok(Some(limit)) => Json(serde_json::json!({ "limit": limit })).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "limit not found"),
        Err(e) => internal_error("updating limit failed", e),
    }
}

pub async fn delete_limit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Response {
    match state.limits.delete(&id).await {
        Ok(true) => Json(serde_json::json!({ "success": true })).into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, "limit not found"),
        Err(e) => internal_error("deleting limit failed", e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/limits/:id/reset
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn reset_limit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Response {
    match state.limits.reset_usage(&id).await {
        Ok(Some(limit)) => Json(serde_json::json!({ "limit": limit })).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "limit not found"),
        Err(e) => internal_error("resetting limit failed", e),
    }
}
