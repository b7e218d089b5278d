//! Reconciliation of local mutations with the remote platform.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;

use depotrack_core::{MovementId, MovementKind, PartId, RemoteId, WorkOrderId};
use depotrack_creator::WriteTarget;
use depotrack_store::{LocalStore, Part, StockMovement, StoreError, WorkOrder};

use crate::mirror::Mirror;

/// Form collecting individual stock movements.
pub const MOVEMENTS_FORM: &str = "Stock_Movements";
/// Form collecting per-part stock snapshots.
pub const SNAPSHOT_FORM: &str = "Stocks";
/// Form collecting maintenance work orders.
pub const WORK_ORDER_FORM: &str = "Work_Order";

/// Reconciliation error.
///
/// Only local problems surface here: bad input (rejected before any storage
/// or network call) and store failures. Remote failures are *not* errors;
/// they degrade to the status strings carried in the outcome types.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of recording an entry or exit.
#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub movement: StockMovement,
    /// The owning part after the quantity change.
    pub part: Part,
    pub mirror_status: String,
}

/// Outcome of recording a physical count (two independent remote sends).
#[derive(Debug, Clone)]
pub struct CountOutcome {
    pub movement: StockMovement,
    pub part: Part,
    pub movement_status: String,
    pub snapshot_status: String,
}

/// Outcome of creating a work order.
#[derive(Debug, Clone)]
pub struct WorkOrderOutcome {
    pub work_order: WorkOrder,
    pub mirror_status: String,
}

/// Outcome of a local deletion.
#[derive(Debug, Clone)]
pub struct DeletionOutcome {
    /// Status of the remote delete; `None` when the row was never mirrored.
    pub mirror_status: Option<String>,
}

/// Outcome of the bulk snapshot sync.
#[derive(Debug, Clone)]
pub struct SnapshotSyncOutcome {
    pub attempted: usize,
    pub failed: usize,
    /// Per-part status, in iteration order: (part code, status line).
    pub statuses: Vec<(String, String)>,
}

/// Synchronous-from-the-caller's-view reconciliation service.
///
/// Each operation commits to the local store, then mirrors best-effort
/// through `M`. The caller shows the returned status strings to the user.
#[derive(Debug)]
pub struct SyncService<M> {
    store: LocalStore,
    mirror: M,
}

impl<M: Mirror> SyncService<M> {
    pub fn new(store: LocalStore, mirror: M) -> Self {
        Self { store, mirror }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Record stock received into the warehouse.
    pub async fn record_entry(&self, code: &str, quantity: i64) -> Result<MovementOutcome, SyncError> {
        self.record_movement(code, MovementKind::Entry, quantity).await
    }

    /// Record stock issued out of the warehouse.
    pub async fn record_exit(&self, code: &str, quantity: i64) -> Result<MovementOutcome, SyncError> {
        self.record_movement(code, MovementKind::Exit, quantity).await
    }

    async fn record_movement(
        &self,
        code: &str,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<MovementOutcome, SyncError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SyncError::Validation("part code cannot be empty".to_string()));
        }
        if quantity <= 0 {
            return Err(SyncError::Validation(
                "quantity must be a positive number".to_string(),
            ));
        }

        let part = self.store.find_or_create_part(code).await?;
        let delta = kind.signed_delta(quantity);
        let new_quantity = part.quantity + delta;
        self.store.update_part_quantity(part.id, new_quantity).await?;

        let recorded_at = Utc::now();
        let mut movement = self
            .store
            .insert_movement(part.id, kind, quantity, None, recorded_at)
            .await?;

        // Local commit done; everything below is best-effort mirroring.
        let payload = movement_payload(code, delta, new_quantity, kind.remote_label(), recorded_at);
        let result = self
            .push_logged(MOVEMENTS_FORM, payload, write_target(part.remote_id.as_ref()))
            .await;

        if let Ok(Some(remote_id)) = &result {
            if self.store.set_movement_remote_id(movement.id, remote_id).await? {
                movement.remote_id = Some(remote_id.clone());
            }
            if part.remote_id.is_none() {
                self.store.set_part_remote_id(part.id, remote_id).await?;
            }
        }

        Ok(MovementOutcome {
            movement,
            part: self.reload_part(part.id).await?,
            mirror_status: status_line(MOVEMENTS_FORM, &result),
        })
    }

    /// Record a physical count: the part's quantity becomes the counted
    /// value, the movement row carries the signed difference, and two
    /// independent payloads go out (movement history and stock snapshot).
    pub async fn record_count(
        &self,
        code: &str,
        counted: i64,
        shelf: &str,
    ) -> Result<CountOutcome, SyncError> {
        let code = code.trim();
        let shelf = shelf.trim();
        if code.is_empty() {
            return Err(SyncError::Validation("part code cannot be empty".to_string()));
        }

        let part = self.store.find_or_create_part(code).await?;
        let difference = counted - part.quantity;

        self.store
            .update_part_quantity_and_shelf(part.id, counted, shelf)
            .await?;

        let recorded_at = Utc::now();
        let mut movement = self
            .store
            .insert_movement(part.id, MovementKind::Count, difference, Some(shelf), recorded_at)
            .await?;

        // Both sends key update-or-create off the part's pre-count remote
        // identifier; write-back stays first-wins either way.
        let target = write_target(part.remote_id.as_ref());

        let movement_result = self
            .push_logged(
                MOVEMENTS_FORM,
                movement_payload(code, difference, counted, MovementKind::Count.remote_label(), recorded_at),
                target.clone(),
            )
            .await;

        if let Ok(Some(remote_id)) = &movement_result {
            if self.store.set_movement_remote_id(movement.id, remote_id).await? {
                movement.remote_id = Some(remote_id.clone());
            }
            if part.remote_id.is_none() {
                self.store.set_part_remote_id(part.id, remote_id).await?;
            }
        }

        let snapshot_result = self
            .push_logged(SNAPSHOT_FORM, snapshot_payload(code, counted, shelf), target)
            .await;

        if let Ok(Some(remote_id)) = &snapshot_result {
            if part.remote_id.is_none() {
                self.store.set_part_remote_id(part.id, remote_id).await?;
            }
        }

        Ok(CountOutcome {
            movement,
            part: self.reload_part(part.id).await?,
            movement_status: status_line(MOVEMENTS_FORM, &movement_result),
            snapshot_status: status_line(SNAPSHOT_FORM, &snapshot_result),
        })
    }

    /// Delete a movement, exactly reversing its effect on the owning part,
    /// then best-effort delete the mirrored record.
    pub async fn delete_movement(&self, id: MovementId) -> Result<DeletionOutcome, SyncError> {
        let movement = self.store.get_movement(id).await?.ok_or(SyncError::NotFound)?;
        let part = self.reload_part(movement.part_id).await?;

        let reversed = part.quantity + movement.kind.reversal_delta(movement.quantity);
        self.store.update_part_quantity(part.id, reversed).await?;
        self.store.delete_movement(id).await?;

        let mirror_status = match &movement.remote_id {
            Some(remote_id) => Some(self.remove_logged(MOVEMENTS_FORM, remote_id).await),
            None => None,
        };

        Ok(DeletionOutcome { mirror_status })
    }

    /// Create a work order locally and mirror it.
    pub async fn create_work_order(
        &self,
        record: &str,
        required_parts: &str,
        status: &str,
    ) -> Result<WorkOrderOutcome, SyncError> {
        let record = record.trim();
        if record.is_empty() {
            return Err(SyncError::Validation(
                "work order record cannot be empty".to_string(),
            ));
        }

        let mut work_order = self
            .store
            .insert_work_order(record, required_parts.trim(), status.trim(), Utc::now())
            .await?;

        let payload = json!({
            "Maintenance_Repair_Records": work_order.record,
            "Required_Parts": work_order.required_parts,
            "Status_Information": work_order.status,
        });

        let result = self
            .push_logged(WORK_ORDER_FORM, payload, WriteTarget::Create)
            .await;

        if let Ok(Some(remote_id)) = &result {
            if self
                .store
                .set_work_order_remote_id(work_order.id, remote_id)
                .await?
            {
                work_order.remote_id = Some(remote_id.clone());
            }
        }

        Ok(WorkOrderOutcome {
            work_order,
            mirror_status: status_line(WORK_ORDER_FORM, &result),
        })
    }

    /// Delete a work order locally, then best-effort delete the mirrored
    /// record.
    pub async fn delete_work_order(&self, id: WorkOrderId) -> Result<DeletionOutcome, SyncError> {
        let work_order = self.store.get_work_order(id).await?.ok_or(SyncError::NotFound)?;
        self.store.delete_work_order(id).await?;

        let mirror_status = match &work_order.remote_id {
            Some(remote_id) => Some(self.remove_logged(WORK_ORDER_FORM, remote_id).await),
            None => None,
        };

        Ok(DeletionOutcome { mirror_status })
    }

    /// Push a snapshot of every part to the remote stock collection.
    ///
    /// Each part's send is independent: a failure is recorded and the loop
    /// keeps going. Newly assigned identifiers are written back first-wins.
    pub async fn sync_all_parts(&self) -> Result<SnapshotSyncOutcome, SyncError> {
        let parts = self.store.list_parts().await?;
        let attempted = parts.len();

        let mut failed = 0;
        let mut statuses = Vec::with_capacity(attempted);

        for part in parts {
            let payload = snapshot_payload(&part.code, part.quantity, &part.shelf);
            let result = self
                .push_logged(SNAPSHOT_FORM, payload, write_target(part.remote_id.as_ref()))
                .await;

            if let Ok(Some(remote_id)) = &result {
                if part.remote_id.is_none() {
                    self.store.set_part_remote_id(part.id, remote_id).await?;
                }
            }
            if result.is_err() {
                failed += 1;
            }

            statuses.push((part.code, status_line(SNAPSHOT_FORM, &result)));
        }

        tracing::info!("snapshot sync pushed {attempted} parts ({failed} failed)");

        Ok(SnapshotSyncOutcome {
            attempted,
            failed,
            statuses,
        })
    }

    async fn push_logged(
        &self,
        form: &str,
        payload: Value,
        target: WriteTarget,
    ) -> Result<Option<RemoteId>, String> {
        match self.mirror.push(form, payload, target).await {
            Ok(id) => Ok(id),
            Err(err) => {
                tracing::warn!("push to {form} failed: {err}");
                Err(err)
            }
        }
    }

    async fn remove_logged(&self, form: &str, id: &RemoteId) -> String {
        match self.mirror.remove(form, id).await {
            Ok(()) => format!("{form}: ok"),
            Err(err) => {
                tracing::warn!("remote delete of {form}/{id} failed: {err}");
                format!("{form}: failed ({err})")
            }
        }
    }

    async fn reload_part(&self, id: PartId) -> Result<Part, SyncError> {
        self.store
            .get_part(id)
            .await?
            .ok_or_else(|| SyncError::Store(StoreError::Corrupt(format!("part {id} disappeared"))))
    }
}

fn write_target(remote_id: Option<&RemoteId>) -> WriteTarget {
    match remote_id {
        Some(id) => WriteTarget::Update(id.clone()),
        None => WriteTarget::Create,
    }
}

fn status_line(form: &str, result: &Result<Option<RemoteId>, String>) -> String {
    match result {
        Ok(_) => format!("{form}: ok"),
        Err(err) => format!("{form}: failed ({err})"),
    }
}

/// Payload for the movement-history form.
fn movement_payload(
    code: &str,
    delta: i64,
    stock: i64,
    label: &str,
    when: DateTime<Utc>,
) -> Value {
    json!({
        "Part_Code": code,
        "Added_Removed": delta,
        "Stock": stock,
        "Movement": label,
        "Date_Time": when.format("%d-%b-%Y %H:%M:%S").to_string(),
    })
}

/// Payload for the per-part stock snapshot form.
fn snapshot_payload(code: &str, quantity: i64, shelf: &str) -> Value {
    json!({
        "Part_Code": code,
        "Available_Quantity": quantity,
        "Shelf_Location": shelf,
    })
}
