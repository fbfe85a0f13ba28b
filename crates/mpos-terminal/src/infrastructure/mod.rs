//! Infrastructure layer for the terminal.
//!
//! Contains the adapters around the use cases: file-system storage, the
//! payment SDK binding, the coordinator task that owns all mutable state, and
//! the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and `mpos_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod coordinator;
pub mod sdk;
pub mod storage;
pub mod ui_bridge;
