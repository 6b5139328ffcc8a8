//! End-to-end HTTP lifecycle tests against the claimd request surface.

use axum_test::TestServer;
use claimd_core::Registry;
use claimd_daemon::{router, AppState};
use serde_json::json;
use std::sync::Arc;

fn server() -> TestServer {
    let registry = Arc::new(Registry::new(300, 600));
    TestServer::new(router(AppState::Ready(registry))).unwrap()
}

#[tokio::test]
async fn full_claim_queue_release_cascade() {
    let server = server();

    server
        .post("/agents/register")
        .json(&json!({"session_id": "a-1"}))
        .await
        .assert_status_ok();

    let claim1 = server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-1", "path": "/repo/main.rs"}))
        .await;
    claim1.assert_status_ok();
    let body: serde_json::Value = claim1.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Work unit claimed");

    let claim2 = server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-2", "path": "/repo/main.rs"}))
        .await;
    let body2: serde_json::Value = claim2.json();
    assert_eq!(body2["success"], false);
    assert_eq!(body2["queue_position"], 1);
    assert_eq!(body2["owner_agent_id"], "a-1");

    let position = server
        .get("/work-units/queue-position?agent_id=a-2&path=/repo/main.rs")
        .await;
    let pos_body: serde_json::Value = position.json();
    assert_eq!(pos_body["in_queue"], true);
    assert_eq!(pos_body["queue_position"], 1);

    server
        .post("/work-units/release")
        .json(&json!({"agent_id": "a-1", "path": "/repo/main.rs"}))
        .await
        .assert_status_ok();

    let wu = server.get("/work-units/by-path?path=/repo/main.rs").await;
    let wu_body: serde_json::Value = wu.json();
    assert_eq!(wu_body["owner_agent_id"], "a-2");
    assert_eq!(wu_body["queue"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn agent_removal_releases_its_claims_over_http() {
    let server = server();

    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-1", "path": "/p"}))
        .await
        .assert_status_ok();
    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-2", "path": "/p"}))
        .await
        .assert_status_ok();

    server.delete("/agents/a-1").await.assert_status(axum::http::StatusCode::NO_CONTENT);

    let wu = server.get("/work-units/by-path?path=/p").await;
    let wu_body: serde_json::Value = wu.json();
    assert_eq!(wu_body["owner_agent_id"], "a-2");

    let agent = server.get("/agents/a-1").await;
    agent.assert_status_not_found();
}

#[tokio::test]
async fn health_reflects_registered_agents_and_claims() {
    let server = server();
    server
        .post("/agents/register")
        .json(&json!({"session_id": "a-1"}))
        .await
        .assert_status_ok();
    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-1", "path": "/x"}))
        .await
        .assert_status_ok();

    let health = server.get("/health").await;
    let body: serde_json::Value = health.json();
    assert_eq!(body["agents_count"], 1);
    assert_eq!(body["work_units_count"], 1);
}

#[tokio::test]
async fn leave_queue_then_claim_again_requeues_at_tail() {
    let server = server();
    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-1", "path": "/w"}))
        .await
        .assert_status_ok();
    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-2", "path": "/w"}))
        .await
        .assert_status_ok();
    server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-3", "path": "/w"}))
        .await
        .assert_status_ok();

    server
        .post("/work-units/leave-queue")
        .json(&json!({"agent_id": "a-2", "path": "/w"}))
        .await
        .assert_status_ok();

    let wu = server.get("/work-units/by-path?path=/w").await;
    let wu_body: serde_json::Value = wu.json();
    let queue = wu_body["queue"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["agent_id"], "a-3");

    let again = server
        .post("/work-units/claim")
        .json(&json!({"agent_id": "a-2", "path": "/w"}))
        .await;
    let again_body: serde_json::Value = again.json();
    assert_eq!(again_body["queue_position"], 2);
}
