//! `depotrack-creator`
//!
//! **Responsibility:** the Zoho Creator remote client.
//!
//! Wraps OAuth2 bearer-token acquisition/refresh (with a local token cache
//! file) and the four REST operations used to mirror local rows: existence
//! check, create, update, delete. Every call is best-effort: an auth failure
//! gets exactly one refresh-and-retry, everything else degrades to an error
//! the caller surfaces as a status string. Nothing here blocks a local write.

pub mod client;
pub mod config;
pub mod token;

pub use client::{CreatorClient, CreatorError, WriteTarget, extract_remote_id};
pub use config::CreatorConfig;
pub use token::TokenManager;
