//! Card-reader identity and connection state.
//!
//! The payment SDK reports a richer connection lifecycle than the terminal
//! needs.  [`SdkConnectionEvent`] mirrors what the SDK delivers (including a
//! forward-compatible catch-all), while [`ConnectionState`] is the small
//! projection the UI consumes.

use std::fmt;

use thiserror::Error;

/// Opaque error passed through from the payment SDK.
///
/// Logged and surfaced to the user; never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("device error: {reason}")]
pub struct DeviceError {
    pub reason: String,
}

impl DeviceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A reader as advertised during discovery or on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    /// The advertised name; readers may advertise none.
    pub name: Option<String>,
}

impl DeviceInfo {
    /// Returns the advertised name, or `"Unknown device"`.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNKNOWN_DEVICE_NAME,
        }
    }

    /// Case-insensitive prefix match against the advertised name.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let Some(name) = self.name.as_deref() else {
            return false;
        };
        name.len() >= prefix.len()
            && name.is_char_boundary(prefix.len())
            && name[..prefix.len()].eq_ignore_ascii_case(prefix)
    }
}

/// Display name used when a reader advertises no name.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown device";

/// Connection lifecycle events as delivered by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkConnectionEvent {
    Connecting,
    Initializing,
    Connected(DeviceInfo),
    Disconnected,
    Error(String),
    /// A variant introduced by a newer SDK.  Carries the SDK's own label.
    Unknown(String),
}

/// UI-facing connection state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected {
        device_id: String,
        display_name: String,
    },
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("Disconnected"),
            ConnectionState::Connecting => f.write_str("Connecting"),
            ConnectionState::Connected { display_name, .. } => {
                write!(f, "Connected to: {display_name}")
            }
            ConnectionState::Error(reason) => write!(f, "Connection error: {reason}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
