//! History checks against a server that returns every user's entries

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use test_case::test_case;
use tokio::sync::Mutex;

use pavlo_contract::ContractProfile;
use pavlo_e2e::{RunnerConfig, Scenario, TestRunner};

#[derive(Default)]
struct Shared {
    users: Vec<String>,
    entries: Vec<Value>,
}

type AppState = Arc<Mutex<Shared>>;

async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut shared = state.lock().await;
    shared.users.push(email.clone());
    let id = shared.users.len() as i64;
    let session = json!({
        "success": true,
        "token": email,
        "accessToken": email,
        "user": {"id": id, "email": email, "isAdmin": false},
    });
    (StatusCode::CREATED, Json(session))
}

async fn add_search(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut entry = body;
    entry["timestamp"] = json!("2025-01-01T12:00:00.000Z");
    state.lock().await.entries.push(entry.clone());
    (StatusCode::CREATED, Json(json!({"success": true, "entry": entry})))
}

// Ignores the caller and lists everything
async fn history(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"history": state.lock().await.entries.clone()}))
}

async fn start_leaking_server() -> String {
    let app = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/search-history", post(add_search).get(history))
        .with_state(AppState::default());

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn scenario(excludes_others: bool) -> Scenario {
    let yaml = format!(
        r#"
name: shared-history
steps:
  - action: register
    actor: alice
  - action: register
    actor: bob
  - action: add_search
    actor: alice
  - action: add_search
    actor: bob
  - action: history
    actor: alice
    excludes_others: {excludes_others}
"#
    );
    Scenario::from_yaml(&yaml).unwrap()
}

#[test_case(ContractProfile::Canonical ; "canonical")]
#[test_case(ContractProfile::Lenient ; "lenient")]
#[tokio::test]
async fn test_history_leaking_other_users_fails(profile: ContractProfile) {
    let base_url = start_leaking_server().await;
    let config = RunnerConfig {
        base_url,
        profile,
        timeout_secs: 5,
        ..RunnerConfig::default()
    };
    let runner = TestRunner::with_config(config).unwrap().without_probe();

    let result = runner.run_spec(&scenario(true)).await;
    assert!(!result.success);
    assert_eq!(result.steps.len(), 5);
    let failed = &result.steps[4];
    assert_eq!(failed.step_name, "history(alice)");
    let error = failed.error.as_deref().unwrap();
    assert!(error.contains("posted by bob"), "{error}");
}

#[tokio::test]
async fn test_history_isolation_can_be_waived() {
    let base_url = start_leaking_server().await;
    let config = RunnerConfig {
        base_url,
        timeout_secs: 5,
        ..RunnerConfig::default()
    };
    let runner = TestRunner::with_config(config).unwrap().without_probe();

    let result = runner.run_spec(&scenario(false)).await;
    assert!(result.success, "{:?}", result.error);
}
