//! mpos-terminal library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does mpos-terminal do? (for beginners)
//!
//! The terminal is a point-of-sale client paired with a card reader.  The
//! reader is driven through a vendor payment SDK that reports everything
//! asynchronously, from its own threads.  This crate is the orchestration
//! core between the UI and that SDK:
//!
//! 1. Persists per-environment merchant credentials plus the session's tags
//!    and split-transfer legs, upgrading documents written by older versions.
//! 2. Validates and converts user input into the request shape the SDK
//!    expects.
//! 3. Runs the transaction lifecycle state machine, fed only by the reader's
//!    status events, and discards results of superseded attempts.
//! 4. Reduces discovery and connection events into a small projection the UI
//!    renders: status, connection text, discovered readers, activity log.

/// Application layer: use cases and the payment SDK port.
pub mod application;

/// Infrastructure layer: storage, SDK adapter, coordinator and UI bridge.
pub mod infrastructure;
