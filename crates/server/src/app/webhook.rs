//! The single webhook route fed by the remote platform.

use axum::{Extension, Json};
use chrono::Utc;
use serde_json::{Value, json};

use depotrack_store::LocalStore;

/// Field marking a payload as a work-order push. Payloads without it are
/// acknowledged and dropped.
const WORK_ORDER_MARKER: &str = "Maintenance_Repair_Records";

/// Accept a push notification from the remote platform.
///
/// A work-order payload is inserted unless a row already matches all three
/// text fields exactly. The response is the same acknowledgment in every
/// case: the sender cannot distinguish "inserted" from "duplicate-skipped"
/// from "ignored".
pub async fn creator_webhook(
    Extension(store): Extension<LocalStore>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    if payload.get(WORK_ORDER_MARKER).is_some() {
        let record = text_field(&payload, WORK_ORDER_MARKER);
        let required_parts = text_field(&payload, "Required_Parts");
        let status = text_field(&payload, "Status_Information");

        match store
            .insert_work_order_if_absent(&record, &required_parts, &status, Utc::now())
            .await
        {
            Ok(Some(work_order)) => {
                tracing::info!("webhook inserted work order {}", work_order.id)
            }
            Ok(None) => tracing::debug!("webhook work order already present, skipped"),
            Err(err) => tracing::error!("webhook work order insert failed: {err}"),
        }
    } else {
        tracing::debug!("webhook payload without work-order marker ignored");
    }

    Json(json!({
        "status": "success",
        "message": "Payload saved",
        "received_payload": payload,
    }))
}

fn text_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
