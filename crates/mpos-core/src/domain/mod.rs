//! Domain entities for the mPOS terminal.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application is called the **domain**.  Domain
//! code contains the core business rules, has **no** imports from OS APIs,
//! storage drivers or the payment SDK, and can be compiled and tested on any
//! platform without external setup.
//!
//! Code in outer layers (application, infrastructure, UI) depends on the
//! domain, but the domain never depends on them.

/// Deployment environments and their merchant/device credentials.
pub mod environment;

/// The persisted user session aggregate: configurations, tags and split transfers.
pub mod session;

/// Transaction kinds, the visible transaction status and generation counters.
pub mod transaction;

/// Card-reader identity and connection state.
pub mod device;
