//! Client behavior against a stub of the remote platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::json;

use depotrack_core::RemoteId;
use depotrack_creator::{CreatorClient, CreatorConfig, CreatorError, WriteTarget, extract_remote_id};

/// Stub of the token endpoint plus the data API.
///
/// Tokens are issued as `tok-1`, `tok-2`, ... and the data API only accepts
/// the latest one, so a client holding a stale token sees a 401 until it
/// refreshes.
#[derive(Debug, Default)]
struct StubState {
    tokens_issued: AtomicUsize,
    deletes: AtomicUsize,
    puts: AtomicUsize,
}

impl StubState {
    fn latest_token(&self) -> String {
        format!("tok-{}", self.tokens_issued.load(Ordering::SeqCst))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Zoho-oauthtoken {}", self.latest_token());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

async fn token_endpoint(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let n = state.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "access_token": format!("tok-{n}"), "expires_in": 3600 }))
}

async fn report_record(
    State(state): State<Arc<StubState>>,
    Path((_owner, _app, _report, id)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == "present" {
        (StatusCode::OK, Json(json!({ "data": { "ID": id } }))).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn delete_record(
    State(state): State<Arc<StubState>>,
    Path((_owner, _app, _report, _id)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.deletes.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "code": 3000 }))).into_response()
}

async fn create_record(
    State(state): State<Arc<StubState>>,
    Path((_owner, _app, _form)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (StatusCode::OK, Json(json!({ "code": 3000, "data": { "ID": "123" } }))).into_response()
}

async fn update_record(
    State(state): State<Arc<StubState>>,
    Path((_owner, _app, _form, id)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.puts.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "code": 3000, "data": { "ID": id } }))).into_response()
}

struct StubServer {
    base_url: String,
    state: Arc<StubState>,
    handle: tokio::task::JoinHandle<()>,
}

impl StubServer {
    async fn spawn() -> Self {
        let state = Arc::new(StubState::default());

        let app = Router::new()
            .route("/oauth/v2/token", post(token_endpoint))
            .route(
                "/creator/v2/data/:owner/:app/report/:report/:id",
                axum::routing::get(report_record).delete(delete_record),
            )
            .route("/creator/v2/data/:owner/:app/form/:form", post(create_record))
            .route("/creator/v2/data/:owner/:app/form/:form/:id", put(update_record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    fn config(&self) -> CreatorConfig {
        CreatorConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            refresh_token: "rt".into(),
            api_domain: self.base_url.clone(),
            accounts_domain: self.base_url.clone(),
            owner_name: "owner".into(),
            app_link_name: "app".into(),
            token_file: temp_token_path(),
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn temp_token_path() -> PathBuf {
    std::env::temp_dir().join(format!("depotrack-stub-{}.json", uuid::Uuid::now_v7()))
}

#[tokio::test]
async fn create_obtains_token_lazily_and_returns_assigned_id() {
    let srv = StubServer::spawn().await;
    let client = CreatorClient::new(srv.config()).unwrap();

    let body = client
        .send(
            "Stock_Movements",
            &json!({ "Part_Code": "A1", "Added_Removed": 10 }),
            &WriteTarget::Create,
        )
        .await
        .unwrap();

    assert_eq!(extract_remote_id(&body), Some(RemoteId::new("123")));
    // One lazy acquisition, no reactive refresh needed.
    assert_eq!(srv.state.tokens_issued.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_cached_token_is_refreshed_once_and_the_call_retried() {
    let srv = StubServer::spawn().await;
    let config = srv.config();

    // Seed the cache file with a token the API no longer accepts.
    std::fs::write(
        &config.token_file,
        r#"{"access_token":"tok-stale","saved_at":1700000000}"#,
    )
    .unwrap();

    let client = CreatorClient::new(config.clone()).unwrap();

    let body = client
        .send("Work_Order", &json!({ "Status_Information": "open" }), &WriteTarget::Create)
        .await
        .unwrap();

    assert_eq!(extract_remote_id(&body), Some(RemoteId::new("123")));
    assert_eq!(srv.state.tokens_issued.load(Ordering::SeqCst), 1);

    // The refreshed token was persisted over the stale one.
    let cached = std::fs::read_to_string(&config.token_file).unwrap();
    assert!(cached.contains("tok-1"));

    std::fs::remove_file(&config.token_file).ok();
}

#[tokio::test]
async fn existence_check_maps_status_codes() {
    let srv = StubServer::spawn().await;
    let client = CreatorClient::new(srv.config()).unwrap();

    assert!(client.check_record_exists("All_Stocks", &RemoteId::new("present")).await);
    assert!(!client.check_record_exists("All_Stocks", &RemoteId::new("absent")).await);
}

#[tokio::test]
async fn delete_of_absent_record_is_idempotent_and_skips_the_delete_call() {
    let srv = StubServer::spawn().await;
    let client = CreatorClient::new(srv.config()).unwrap();

    client.delete("Stocks", &RemoteId::new("absent")).await.unwrap();
    assert_eq!(srv.state.deletes.load(Ordering::SeqCst), 0);

    client.delete("Stocks", &RemoteId::new("present")).await.unwrap();
    assert_eq!(srv.state.deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_puts_to_the_record_path() {
    let srv = StubServer::spawn().await;
    let client = CreatorClient::new(srv.config()).unwrap();

    let body = client
        .send(
            "Stocks",
            &json!({ "Part_Code": "A1", "Available_Quantity": 7 }),
            &WriteTarget::Update(RemoteId::new("55")),
        )
        .await
        .unwrap();

    assert_eq!(srv.state.puts.load(Ordering::SeqCst), 1);
    assert_eq!(extract_remote_id(&body), Some(RemoteId::new("55")));
}

#[tokio::test]
async fn unreachable_api_yields_a_network_error_not_a_panic() {
    // Nothing is listening on this address.
    let config = CreatorConfig {
        client_id: "cid".into(),
        client_secret: "secret".into(),
        refresh_token: "rt".into(),
        api_domain: "http://127.0.0.1:1".into(),
        accounts_domain: "http://127.0.0.1:1".into(),
        owner_name: "owner".into(),
        app_link_name: "app".into(),
        token_file: temp_token_path(),
        request_timeout: Duration::from_secs(1),
    };

    let client = CreatorClient::new(config).unwrap();
    let err = client
        .send("Stocks", &json!({}), &WriteTarget::Create)
        .await
        .unwrap_err();

    assert!(matches!(err, CreatorError::Network(_)));
}
