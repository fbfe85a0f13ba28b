//! Application layer use cases for the terminal.
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "run a sale
//!   of 3.14 with two split-transfer legs").
//! - **Depend on abstractions** (the [`payment_sdk::PaymentSdk`] trait) rather
//!   than concrete implementations, so the SDK binding can be swapped without
//!   changing this code.
//! - **Contain no file system access and no SDK binding code**.
//!
//! # Sub-modules
//!
//! - **`payment_sdk`**    – The SDK port, the inbound event types and the
//!   channel handles the SDK uses to report back.
//!
//! - **`run_transaction`** – The transaction lifecycle state machine.  Its
//!   visible state only ever changes in response to reader status events.
//!
//! - **`track_devices`**  – Reduces discovery and connection events into the
//!   connection state and discovered-reader list shown by the UI.
//!
//! - **`edit_session`**   – Builds modified copies of the session for the
//!   settings screens (configuration, tags / split transfers, defaults).
//!
//! - **`activity_log`**   – The user-visible, timestamped, append-only log.

pub mod activity_log;
pub mod edit_session;
pub mod payment_sdk;
pub mod run_transaction;
pub mod track_devices;
