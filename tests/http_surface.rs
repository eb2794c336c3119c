//! Crate-level integration tests for the HTTP surface (spec.md §8): cold
//! start, decide, heartbeat, state, save-state, frames, memstash and
//! leaderboard, all in-process against the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use arcade_pilot::clock::SystemClock;
use arcade_pilot::coordinator::CoordinatorRegistry;
use arcade_pilot::decision::DecisionStep;
use arcade_pilot::frame_source::MockFrameSource;
use arcade_pilot::llm::{FakeChatModel, VisionChatModel};
use arcade_pilot::memory::MemoryStore;
use arcade_pilot::persistence::{InMemoryBlob, InMemoryKv};
use arcade_pilot::server::{build_router, ServeState};
use arcade_pilot::Config;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn valid_decision_json() -> String {
    json!({
        "gameState": {},
        "screenAnalysis": "overworld, nothing blocking",
        "reasoning": "heading toward the exit",
        "personality_comment": null,
        "buttonSequence": [{"confidences": {
            "a": 0.05, "b": 0.05, "start": 0.0, "select": 0.0,
            "up": 0.9, "down": 0.0, "left": 0.0, "right": 0.0,
            "l": 0.0, "r": 0.0, "wait": 0.0
        }}],
        "progressConfidence": 0.7,
        "notes": {}
    })
    .to_string()
}

fn test_app(scripted_completions: Vec<String>) -> axum::Router {
    let clock = Arc::new(SystemClock);
    let kv = Arc::new(InMemoryKv::new());
    let blob = Arc::new(InMemoryBlob::new());
    let memory = Arc::new(MemoryStore::new(kv.clone()));
    let frame_source = Arc::new(MockFrameSource::changing());
    let model: Arc<dyn VisionChatModel> = Arc::new(FakeChatModel::scripted("test/fake", scripted_completions));
    let decision_step = Arc::new(DecisionStep::new(
        model,
        memory.clone(),
        Duration::from_secs(1),
        Duration::from_secs(1),
    ));
    let registry = Arc::new(CoordinatorRegistry::new(
        clock.clone(),
        kv.clone(),
        blob.clone(),
        memory.clone(),
        frame_source,
        decision_step,
        Config::default().loop_,
    ));
    let state = ServeState::new(registry, kv, blob, memory, Arc::new(Config::default()), clock);
    state.health.mark_live();
    state.health.mark_ready();
    build_router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_livez_readyz_report_ok_at_cold_start() {
    let app = test_app(vec![]);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["liveAgents"], 0);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/livez").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn decide_then_get_agent_roundtrips() {
    let app = test_app(vec!["{}".to_string(), valid_decision_json()]);

    let body = json!({
        "agentId": "agent-1",
        "modelId": "test/fake",
        "frame": "x".repeat(2000),
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let decided = json_body(response).await;
    assert_eq!(decided["success"], true);
    assert_eq!(decided["decision"]["button"], "up");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/agent/decide?agentId=agent-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let agent = json_body(response).await;
    assert_eq!(agent["success"], true);
    assert_eq!(agent["totalDecisions"], 1);
}

#[tokio::test]
async fn decide_with_missing_fields_is_bad_request() {
    let app = test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(json!({"agentId": "", "modelId": "m", "frame": ""}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decide_rejects_a_frame_below_the_1024_byte_minimum() {
    let app = test_app(vec![]);
    let body = json!({"agentId": "agent-small-frame", "modelId": "test/fake", "frame": "x".repeat(999)});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decide_accepts_a_frame_at_the_1024_byte_minimum() {
    let app = test_app(vec![valid_decision_json()]);
    let body = json!({"agentId": "agent-min-frame", "modelId": "test/fake", "frame": "x".repeat(1001)});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_agent_unknown_id_is_not_found() {
    let app = test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/agent/decide?agentId=nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn model_timeout_still_reports_a_fallback_decision() {
    // No scripted completions: the fake model errors immediately, which
    // the decision step turns into the canonical WAIT fallback rather
    // than surfacing a 500.
    let app = test_app(vec![]);
    let body = json!({
        "agentId": "agent-timeout",
        "modelId": "test/fake",
        "frame": "x".repeat(2000),
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let decided = json_body(response).await;
    assert_eq!(decided["decision"]["isFallback"], true);
    assert_eq!(decided["decision"]["button"], "wait");
}

#[tokio::test]
async fn heartbeat_roundtrips_and_reports_alive() {
    let app = test_app(vec!["{}".to_string(), valid_decision_json()]);

    // decide first, so the agent exists in the registry.
    let body = json!({"agentId": "agent-hb", "modelId": "test/fake", "frame": "x".repeat(2000)});
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/heartbeat")
                .header("content-type", "application/json")
                .body(Body::from(json!({"agentId": "agent-hb"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let beat = json_body(response).await;
    assert_eq!(beat["success"], true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/heartbeat?agentId=agent-hb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["alive"], true);
}

#[tokio::test]
async fn state_write_then_read_then_delete() {
    let app = test_app(vec![]);

    let write = json!({"agentId": "agent-state", "state": {"hello": "world"}});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/state")
                .header("content-type", "application/json")
                .body(Body::from(write.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/state?agentId=agent-state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let read = json_body(response).await;
    assert_eq!(read["state"]["hello"], "world");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/state?agentId=agent-state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/state?agentId=agent-state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_state_for_unregistered_agent_is_bad_request() {
    let app = test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/save-state")
                .header("content-type", "application/json")
                .body(Body::from(json!({"agentId": "ghost"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn save_state_then_parse_state_reports_the_mock_checkpoint() {
    let app = test_app(vec!["{}".to_string(), valid_decision_json()]);

    // register the agent first via decide.
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"agentId": "agent-ckpt", "modelId": "test/fake", "frame": "x".repeat(2000)}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/save-state")
                .header("content-type", "application/json")
                .body(Body::from(json!({"agentId": "agent-ckpt"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["success"], true);
    assert!(saved["filename"].as_str().unwrap().starts_with("save-states/agent-ckpt/"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/parse-state?agentId=agent-ckpt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["parsed"]["status"], "partial");
}

#[tokio::test]
async fn frames_post_then_list() {
    let app = test_app(vec![]);
    let frame_b64 = "aGVsbG8gd29ybGQ="; // "hello world"

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/frames")
                .header("content-type", "application/json")
                .body(Body::from(json!({"agentId": "agent-frames", "frame": frame_b64}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/frames?agentId=agent-frames")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed["totalCount"], 1);
}

#[tokio::test]
async fn memstash_get_then_delete_clears_notes() {
    let app = test_app(vec!["{}".to_string(), valid_decision_json()]);

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/decide")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"agentId": "agent-mem", "modelId": "test/fake", "frame": "x".repeat(2000)}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/memstash?agentId=agent-mem")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/memstash?agentId=agent-mem")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = json_body(response).await;
    assert_eq!(cleared["success"], true);
}

#[tokio::test]
async fn leaderboard_is_empty_for_an_unknown_kind() {
    let app = test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard/badges")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let board = json_body(response).await;
    assert_eq!(board["entries"].as_array().unwrap().len(), 0);
}
