//! `depotrack-store`
//!
//! **Responsibility:** the local SQLite store.
//!
//! Three tables back the whole application: `parts`, `stock_movements`, and
//! `work_orders`. Each row optionally carries the identifier the remote
//! platform assigned when the row was first mirrored. The local store is the
//! authority: every user action commits here before any remote call is
//! attempted, and the application stays fully usable offline.
//!
//! Schema is create-if-absent at startup; there are no migrations.

pub mod records;
pub mod store;

pub use records::{MovementWithPart, Part, StockMovement, WorkOrder};
pub use store::{LocalStore, StoreError};
