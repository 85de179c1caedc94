//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `admin.rs` — account and admin-panel command trees.
//! - `runtime.rs` — report/issues/orgs/comments/resolutions/lang.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*` and the API client.
//! - Keep behavior and output schema stable.

pub mod admin;
pub mod runtime;

pub use admin::{handle_account_commands, handle_admin_commands};
pub use runtime::handle_runtime_commands;
