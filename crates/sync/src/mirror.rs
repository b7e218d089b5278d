//! The seam between local mutations and the remote platform.

use serde_json::Value;

use depotrack_core::RemoteId;
use depotrack_creator::{CreatorClient, WriteTarget, extract_remote_id};

/// Best-effort push/remove operations against the remote platform.
///
/// [`CreatorClient`] is the production implementation; tests substitute an
/// in-memory recorder. Errors are already flattened to the diagnostic string
/// shown to the user, so callers never need to understand transport detail.
#[allow(async_fn_in_trait)]
pub trait Mirror {
    /// Push a record to a form, creating or updating per `target`.
    ///
    /// `Ok` carries the remote identifier assigned by the platform when the
    /// response body named one; a well-formed success without an extractable
    /// identifier is `Ok(None)` and leaves local remote identifiers unset.
    async fn push(
        &self,
        form: &str,
        payload: Value,
        target: WriteTarget,
    ) -> Result<Option<RemoteId>, String>;

    /// Remove a previously mirrored record. Idempotent: removing a record
    /// that is already gone remotely succeeds.
    async fn remove(&self, form: &str, id: &RemoteId) -> Result<(), String>;
}

impl Mirror for CreatorClient {
    async fn push(
        &self,
        form: &str,
        payload: Value,
        target: WriteTarget,
    ) -> Result<Option<RemoteId>, String> {
        match self.send(form, &payload, &target).await {
            Ok(body) => Ok(extract_remote_id(&body)),
            Err(err) => Err(err.to_string()),
        }
    }

    async fn remove(&self, form: &str, id: &RemoteId) -> Result<(), String> {
        self.delete(form, id).await.map_err(|e| e.to_string())
    }
}
