//! `depotrack-sync`
//!
//! **Responsibility:** reconciliation between the local store and the remote
//! platform.
//!
//! Every user action commits locally first, then mirrors the change through
//! the [`Mirror`] seam. Remote failures never roll back or block the local
//! write; they degrade to a human-readable status string carried in the
//! returned outcome, and nothing is queued for a later retry. The manual
//! snapshot sync ([`SyncService::sync_all_parts`]) is the only recovery path
//! for rows the platform never confirmed.

pub mod mirror;
pub mod service;

pub use mirror::Mirror;
pub use service::{
    CountOutcome, DeletionOutcome, MovementOutcome, SnapshotSyncOutcome, SyncError, SyncService,
    WorkOrderOutcome, MOVEMENTS_FORM, SNAPSHOT_FORM, WORK_ORDER_FORM,
};
