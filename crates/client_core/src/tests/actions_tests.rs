use std::{sync::Arc, time::Duration};

use super::*;
use crate::{
    config::{normalize_api_url, ClientSettings},
    token_store::{InMemoryTokenStore, TokenStore},
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::protocol::UserDataPatch;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockState {
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    patches: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn handle_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "rahasia123" {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "token": "jwt-abc",
                "message": "Login berhasil",
                "user": { "id": "u-1", "email": "budi@example.com" }
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Password salah" })),
        )
    }
}

async fn handle_profile(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth_headers.lock().await.push(auth.clone());
    match auth.as_deref() {
        Some("Bearer jwt-abc") => (
            StatusCode::OK,
            Json(json!({ "id": "u-1", "first_name": "Budi", "last_name": "Santoso" })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Token tidak valid" })),
        ),
    }
}

async fn handle_check_phone(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["phone_number"].as_str() {
        Some("081234567890") => (
            StatusCode::OK,
            Json(json!({ "success": true, "exists": true })),
        ),
        Some("089999999999") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database unavailable" })),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({ "success": true, "exists": false })),
        ),
    }
}

async fn handle_otp_verify(Json(body): Json<Value>) -> Json<Value> {
    if body["otp_code"] == "123456" {
        Json(json!({ "success": true, "message": "OTP valid" }))
    } else {
        Json(json!({ "success": false, "message": "" }))
    }
}

async fn handle_update_user(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.patches.lock().await.push((id.clone(), body));
    Json(json!({ "id": id, "city": "Bandung" }))
}

async fn spawn_api_server() -> anyhow::Result<(String, MockState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::default();
    let app = Router::new()
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/profile", get(handle_profile))
        .route("/api/auth/check-phone", post(handle_check_phone))
        .route("/api/otp/verify", post(handle_otp_verify))
        .route("/api/users/:id", put(handle_update_user))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), state))
}

fn client_for(base: &str, tokens: Arc<dyn TokenStore>) -> ApiClient {
    let settings = ClientSettings {
        api_base_url: normalize_api_url(base).expect("base url"),
        request_timeout: Duration::from_secs(5),
        ..ClientSettings::default()
    };
    ApiClient::new(&settings, tokens).expect("api client")
}

#[tokio::test]
async fn login_persists_token_and_authorizes_profile() {
    let (base, state) = spawn_api_server().await.expect("spawn server");
    let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let actions = HttpActions::new(client_for(&base, tokens.clone()));

    let session = actions
        .login("081234567890", "rahasia123")
        .await
        .expect("login");
    assert_eq!(session.token.as_deref(), Some("jwt-abc"));
    assert_eq!(session.user.expect("user").id, "u-1");
    assert_eq!(
        tokens.load().await.expect("load").as_deref(),
        Some("jwt-abc")
    );

    let profile = actions.api().profile().await.expect("profile");
    assert_eq!(profile.display_name(), "Budi Santoso");
    assert_eq!(
        state.auth_headers.lock().await.as_slice(),
        &[Some("Bearer jwt-abc".to_string())]
    );
}

#[tokio::test]
async fn rejected_login_passes_server_message_through() {
    let (base, _state) = spawn_api_server().await.expect("spawn server");
    let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let actions = HttpActions::new(client_for(&base, tokens.clone()));

    let failure = actions
        .login("081234567890", "salah")
        .await
        .expect_err("login must fail");
    assert_eq!(failure, ActionFailure::business("Password salah"));
    assert!(tokens.load().await.expect("load").is_none());
}

#[tokio::test]
async fn unauthorized_profile_maps_to_unauthorized_error() {
    let (base, _state) = spawn_api_server().await.expect("spawn server");
    let api = client_for(&base, Arc::new(InMemoryTokenStore::with_token("expired")));

    let err = api.profile().await.expect_err("profile must fail");
    assert!(err.is_unauthorized());
    assert_eq!(err.message, "Token tidak valid");

    let failure = ActionFailure::from(err);
    assert_eq!(failure.kind, FailureKind::Unauthorized);
}

#[tokio::test]
async fn check_phone_errors_are_not_read_as_unregistered() {
    let (base, _state) = spawn_api_server().await.expect("spawn server");
    let actions = HttpActions::new(client_for(&base, Arc::new(InMemoryTokenStore::new())));

    assert!(actions
        .check_phone_exists("081234567890")
        .await
        .expect("registered"));
    assert!(!actions
        .check_phone_exists("081200000000")
        .await
        .expect("unregistered"));

    let failure = actions
        .check_phone_exists("089999999999")
        .await
        .expect_err("server error must surface");
    assert_eq!(failure.kind, FailureKind::Business);
    assert_eq!(failure.message, "database unavailable");
}

#[tokio::test]
async fn failed_otp_without_message_uses_fallback() {
    let (base, _state) = spawn_api_server().await.expect("spawn server");
    let actions = HttpActions::new(client_for(&base, Arc::new(InMemoryTokenStore::new())));

    actions
        .verify_otp("081234567890", "123456")
        .await
        .expect("valid code");
    let failure = actions
        .verify_otp("081234567890", "000000")
        .await
        .expect_err("wrong code");
    assert_eq!(failure.message, "Kode verifikasi salah");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let actions = HttpActions::new(client_for(
        &format!("http://{addr}/api"),
        Arc::new(InMemoryTokenStore::new()),
    ));
    let failure = actions
        .send_otp("081234567890")
        .await
        .expect_err("nothing listening");
    assert_eq!(failure, ActionFailure::transport());
    assert_eq!(failure.message, TRANSPORT_FAILURE_MESSAGE);
}

#[tokio::test]
async fn update_user_puts_only_changed_fields() {
    let (base, state) = spawn_api_server().await.expect("spawn server");
    let api = client_for(&base, Arc::new(InMemoryTokenStore::with_token("jwt-abc")));

    let patch = UserDataPatch {
        city: Some("Bandung".to_string()),
        ..UserDataPatch::default()
    };
    let profile = api.update_user("u-1", &patch).await.expect("update");
    assert_eq!(profile.city.as_deref(), Some("Bandung"));

    let patches = state.patches.lock().await;
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "u-1");
    assert_eq!(patches[0].1, json!({ "city": "Bandung" }));
}

#[tokio::test]
async fn missing_actions_report_unavailable() {
    let failure = MissingExternalActions
        .check_phone_exists("081234567890")
        .await
        .expect_err("no backend");
    assert_eq!(failure.kind, FailureKind::Business);
}
