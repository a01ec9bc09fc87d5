//! Integration tests for the HTTP API.
//!
//! Each test starts a real axum server on a random port, backed by stores
//! in a fresh temp directory, and drives it with reqwest.

use std::sync::Arc;

use ll_domain::config::{Config, TeamEntry};
use ll_gateway::{api, bootstrap};
use serde_json::{json, Value};

/// Spawn a server with agent `a1` in team `t1` of organization `o1`.
/// The temp dir must outlive the test.
async fn spawn_test_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.storage.state_path = dir.path().to_path_buf();
    config.directory.teams.push(TeamEntry {
        id: "t1".into(),
        organization_id: "o1".into(),
        agents: vec!["a1".into()],
    });

    let state = bootstrap::build_app_state(Arc::new(config)).unwrap();
    let app = api::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), dir)
}

async fn create_limit(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let resp = client
        .post(format!("{base}/v1/limits"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let json: Value = resp.json().await.unwrap();
    json["limit"].clone()
}

fn token_limit(entity_type: &str, entity_id: &str) -> Value {
    json!({
        "entity_type": entity_type,
        "entity_id": entity_id,
        "limit_type": "token_cost",
        "limit_value": 1000,
        "model": "gpt-4o",
    })
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let (base, _dir) = spawn_test_server().await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}

// ── Limit CRUD ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_rejects_missing_qualifier() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/limits"))
        .json(&json!({
            "entity_type": "agent",
            "entity_id": "a1",
            "limit_type": "tool_calls",
            "limit_value": 10,
            "mcp_server_name": "github",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn limit_crud_cycle() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let limit = create_limit(&client, &base, token_limit("agent", "a1")).await;
    let id = limit["id"].as_str().unwrap().to_string();
    assert_eq!(limit["current_usage_tokens_in"], 0);
    assert_eq!(limit["current_usage_tokens_out"], 0);

    let resp = client
        .get(format!("{base}/v1/limits/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .patch(format!("{base}/v1/limits/{id}"))
        .json(&json!({ "limit_value": 5000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["limit"]["limit_value"], 5000);
    assert_eq!(json["limit"]["entity_id"], "a1");

    let resp = client
        .delete(format!("{base}/v1/limits/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);

    let resp = client
        .get(format!("{base}/v1/limits/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn delete_unknown_limit_is_not_found() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("{base}/v1/limits/{}", uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn list_filters_by_entity() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    create_limit(&client, &base, token_limit("agent", "a1")).await;
    create_limit(&client, &base, token_limit("team", "t1")).await;

    let resp = client
        .get(format!("{base}/v1/limits?entity_type=team"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["limits"][0]["entity_id"], "t1");
}

#[tokio::test]
async fn blank_query_values_are_unconstrained() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    create_limit(&client, &base, token_limit("agent", "a1")).await;
    create_limit(&client, &base, token_limit("team", "t1")).await;

    let json: Value = client
        .get(format!("{base}/v1/limits?entity_type=&entity_id="))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let bad_body = client
        .post(format!("{base}/v1/limits"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    let bad_id = client
        .get(format!("{base}/v1/limits/not-a-uuid"))
        .send()
        .await
        .unwrap();
    let bad_query = client
        .get(format!("{base}/v1/limits?entity_type=planet"))
        .send()
        .await
        .unwrap();

    for resp in [bad_body, bad_id, bad_query] {
        assert_eq!(resp.status(), 400);
        let json: Value = resp.json().await.unwrap();
        assert!(json["error"].is_string(), "{json}");
    }
}

// ── Usage fan-out ────────────────────────────────────────────────────

#[tokio::test]
async fn interaction_charges_agent_team_and_organization() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    create_limit(&client, &base, token_limit("organization", "o1")).await;
    create_limit(&client, &base, token_limit("team", "t1")).await;
    create_limit(&client, &base, token_limit("agent", "a1")).await;

    let resp = client
        .post(format!("{base}/v1/interactions"))
        .json(&json!({
            "agent_id": "a1",
            "model": "gpt-4o",
            "input_tokens": 100,
            "output_tokens": 40,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let json: Value = client
        .get(format!("{base}/v1/limits"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let limits = json["limits"].as_array().unwrap();
    assert_eq!(limits.len(), 3);
    for limit in limits {
        assert_eq!(limit["current_usage_tokens_in"], 100, "{limit}");
        assert_eq!(limit["current_usage_tokens_out"], 40, "{limit}");
    }

    let usage: Value = client
        .get(format!("{base}/v1/agents/a1/token-usage"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(usage["total_input_tokens"], 100);
    assert_eq!(usage["total_output_tokens"], 40);
    assert_eq!(usage["total_tokens"], 140);
}

#[tokio::test]
async fn interaction_without_agent_is_rejected() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/interactions"))
        .json(&json!({ "agent_id": " ", "input_tokens": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn mcp_call_increments_matching_server_only() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let github = create_limit(
        &client,
        &base,
        json!({
            "entity_type": "agent",
            "entity_id": "a1",
            "limit_type": "mcp_server_calls",
            "limit_value": 10,
            "mcp_server_name": "github",
        }),
    )
    .await;
    let slack = create_limit(
        &client,
        &base,
        json!({
            "entity_type": "agent",
            "entity_id": "a1",
            "limit_type": "mcp_server_calls",
            "limit_value": 10,
            "mcp_server_name": "slack",
        }),
    )
    .await;

    let resp = client
        .post(format!("{base}/v1/usage/mcp-calls"))
        .json(&json!({
            "entity_type": "agent",
            "entity_id": "a1",
            "mcp_server_name": "github",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let get = |id: String| {
        let client = client.clone();
        let base = base.clone();
        async move {
            let json: Value = client
                .get(format!("{base}/v1/limits/{id}"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            json["limit"]["current_usage_tokens_in"].as_u64().unwrap()
        }
    };
    assert_eq!(get(github["id"].as_str().unwrap().to_string()).await, 1);
    assert_eq!(get(slack["id"].as_str().unwrap().to_string()).await, 0);
}

// ── Validation lookup, reset, cleanup ────────────────────────────────

#[tokio::test]
async fn validation_lookup_defaults_to_token_cost() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    create_limit(&client, &base, token_limit("team", "t1")).await;

    let json: Value = client
        .get(format!(
            "{base}/v1/limits/validation?entity_type=team&entity_id=t1"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["limits"][0]["limit_type"], "token_cost");
}

#[tokio::test]
async fn reset_zeroes_counters() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let limit = create_limit(&client, &base, token_limit("agent", "a1")).await;
    let id = limit["id"].as_str().unwrap().to_string();

    client
        .post(format!("{base}/v1/interactions"))
        .json(&json!({ "agent_id": "a1", "input_tokens": 7, "output_tokens": 3 }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/v1/limits/{id}/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["limit"]["current_usage_tokens_in"], 0);
    assert_eq!(json["limit"]["current_usage_tokens_out"], 0);
    assert!(json["limit"]["last_cleanup"].is_string());
}

#[tokio::test]
async fn organization_header_triggers_cleanup() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    create_limit(&client, &base, token_limit("organization", "o1")).await;
    client
        .post(format!("{base}/v1/interactions"))
        .json(&json!({ "agent_id": "a1", "input_tokens": 10, "output_tokens": 5 }))
        .send()
        .await
        .unwrap();

    // Without the header the counters are left alone.
    let json: Value = client
        .get(format!("{base}/v1/limits?entity_type=organization"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["limits"][0]["current_usage_tokens_in"], 10);

    // Never-cleaned rows are due on the first read with the header.
    let json: Value = client
        .get(format!("{base}/v1/limits?entity_type=organization"))
        .header("X-Organization-Id", "o1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["limits"][0]["current_usage_tokens_in"], 0);
    assert_eq!(json["limits"][0]["current_usage_tokens_out"], 0);
}

#[tokio::test]
async fn listing_prices_models_seen_in_interactions() {
    let (base, _dir) = spawn_test_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/v1/interactions"))
        .json(&json!({ "agent_id": "a1", "model": "mystery-model", "input_tokens": 1 }))
        .send()
        .await
        .unwrap();
    client.get(format!("{base}/v1/limits")).send().await.unwrap();

    let json: Value = client
        .get(format!("{base}/v1/pricing"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let prices = json["prices"].as_array().unwrap();
    let row = prices
        .iter()
        .find(|p| p["model"] == "mystery-model")
        .unwrap();
    assert_eq!(row["defaulted"], true);
}
