//! Black-box tests of the webhook listener.

use serde_json::json;

use depotrack_store::LocalStore;

struct TestServer {
    base_url: String,
    store: LocalStore,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port, sharing the store
        // handle so tests can inspect what the webhook wrote.
        let store = LocalStore::in_memory().await.expect("failed to open store");
        let app = depotrack_server::app::build_app(store.clone());

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
            store,
            handle,
        }
    }

    fn webhook_url(&self) -> String {
        format!("{}/creator-webhook", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_endpoint_responds() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn work_order_push_is_inserted_and_acknowledged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let payload = json!({
        "Maintenance_Repair_Records": "replace filter",
        "Required_Parts": "filter cartridge",
        "Status_Information": "open",
    });

    let res = client
        .post(srv.webhook_url())
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Payload saved");
    assert_eq!(body["received_payload"], payload);

    let orders = srv.store.list_work_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].record, "replace filter");
    assert_eq!(orders[0].required_parts, "filter cartridge");
    assert_eq!(orders[0].status, "open");
    assert!(orders[0].remote_id.is_none());
}

#[tokio::test]
async fn identical_push_is_deduplicated_but_still_acknowledged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let payload = json!({
        "Maintenance_Repair_Records": "grease conveyor",
        "Required_Parts": "",
        "Status_Information": "open",
    });

    for _ in 0..2 {
        let res = client
            .post(srv.webhook_url())
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["status"], "success");
    }

    assert_eq!(srv.store.list_work_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn push_differing_in_one_field_inserts_again() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let open = json!({
        "Maintenance_Repair_Records": "grease conveyor",
        "Required_Parts": "grease gun",
        "Status_Information": "open",
    });
    let mut closed = open.clone();
    closed["Status_Information"] = json!("closed");

    for payload in [&open, &closed] {
        client
            .post(srv.webhook_url())
            .json(payload)
            .send()
            .await
            .unwrap();
    }

    assert_eq!(srv.store.list_work_orders().await.unwrap().len(), 2);
}

#[tokio::test]
async fn payload_without_marker_is_acknowledged_but_ignored() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.webhook_url())
        .json(&json!({ "Some_Other_Notification": "ping" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");

    assert!(srv.store.list_work_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn marker_with_missing_companion_fields_defaults_them_empty() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    client
        .post(srv.webhook_url())
        .json(&json!({ "Maintenance_Repair_Records": "inspect belt" }))
        .send()
        .await
        .unwrap();

    let orders = srv.store.list_work_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].record, "inspect belt");
    assert_eq!(orders[0].required_parts, "");
    assert_eq!(orders[0].status, "");
}
