//! # mpos-core
//!
//! Shared library for the mPOS terminal containing the domain model, the tag
//! mini-language codec and the amount conversion used at the payment boundary.
//!
//! It has zero dependencies on OS APIs, async runtimes, storage or the payment
//! SDK.  Everything here can be unit-tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! The terminal pairs with a card-reader peripheral and submits payment
//! transactions through a vendor SDK.  This crate (`mpos-core`) is the shared
//! foundation.  It defines:
//!
//! - **`domain`** – The data the terminal works with: deployment environments
//!   and their merchant credentials, the persisted user session (tags and
//!   split-transfer legs), transaction status and the card-reader connection
//!   state.
//!
//! - **`codec`** – Pure text conversions: the `key:value,key:value` tag
//!   mini-language and the conversion of user-entered amounts into integer
//!   minor currency units.

pub mod codec;
pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `mpos_core::UserSessionData` instead of `mpos_core::domain::session::UserSessionData`.
pub use codec::amount::{to_minor_units, AmountError, MinorUnits};
pub use codec::tags::{format_tags, parse_tags, validate_tags_format, Tags};
pub use domain::device::{ConnectionState, DeviceError, DeviceInfo, SdkConnectionEvent};
pub use domain::environment::{AllEnvironmentConfigurations, Environment, EnvironmentConfig};
pub use domain::session::{SplitTransferEntry, UserSessionData, ValidationError};
pub use domain::transaction::{
    Generation, TransactionKind, TransactionRequest, TransactionStatus, TransferLeg,
};
