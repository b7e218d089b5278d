//! HTTP application wiring (Axum router).

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use depotrack_store::LocalStore;

pub mod webhook;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(store: LocalStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/creator-webhook", post(webhook::creator_webhook))
        .layer(Extension(store))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
