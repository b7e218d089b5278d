//! `depotrack-server`
//!
//! **Responsibility:** the inbound webhook listener.
//!
//! One route accepts the remote platform's work-order push notifications,
//! deduplicates them against the local store, and always acknowledges. The
//! binary wires the store and serves this app; the reconciliation services
//! in `depotrack-sync` are the library surface invoked by the (out-of-tree)
//! presentation layer.

pub mod app;
