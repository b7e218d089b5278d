//! Typed rows of the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotrack_core::{MovementId, MovementKind, PartId, RemoteId, WorkOrderId};

/// A stock-keeping part, keyed by its business code.
///
/// Parts are created implicitly on the first movement or count referencing an
/// unseen code and are never deleted. `quantity` is signed and may go
/// negative (e.g. an exit recorded before the matching entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub shelf: String,
    pub remote_id: Option<RemoteId>,
}

/// A single entry, exit, or count event affecting a part's quantity.
///
/// `quantity` holds the magnitude for entry/exit movements and the signed
/// difference (counted minus previous stock) for counts. `shelf` is recorded
/// for counts only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub part_id: PartId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub shelf: Option<String>,
    pub remote_id: Option<RemoteId>,
    pub recorded_at: DateTime<Utc>,
}

/// A maintenance work order, created by a user or by the inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub record: String,
    pub required_parts: String,
    pub status: String,
    pub remote_id: Option<RemoteId>,
    pub recorded_at: DateTime<Utc>,
}

/// A movement joined with its owning part, as shown in the movement tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementWithPart {
    pub movement: StockMovement,
    pub part_code: String,
    /// The part's current quantity (after all surviving movements).
    pub part_quantity: i64,
}
