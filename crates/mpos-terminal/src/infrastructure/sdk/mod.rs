//! Payment SDK adapters.
//!
//! Anything implementing [`PaymentSdk`](crate::application::payment_sdk::PaymentSdk)
//! can drive the terminal.  This module ships a simulated reader for
//! headless runs and demos.

pub mod simulated;
