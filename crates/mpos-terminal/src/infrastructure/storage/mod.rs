//! Storage infrastructure: application config and session persistence.
//!
//! - `config`        – the operator's TOML file (log level, reader family,
//!   session location, factory default credentials).
//! - `session_store` – the [`ConfigStore`](session_store::ConfigStore) that
//!   loads and saves the user session document.
//! - `legacy`        – upgrades session documents written by older versions.
//! - `medium`        – where the session bytes live (a file or memory).

pub mod config;
mod legacy;
pub mod medium;
pub mod session_store;
