//! DeviceSessionProjector: reader discovery and connection state.
//!
//! Reduces the SDK's discovery and connection events into the small
//! projection the UI renders:
//!
//! - the discovered-reader list, filtered to the supported product family
//!   by case-insensitive name prefix and deduplicated by device id;
//! - the [`ConnectionState`] plus its user-facing text;
//! - activity log lines for the transitions the user cares about.
//!
//! `Connecting` and `Initializing` are treated as one "not yet connected"
//! phase: the state becomes `Connecting`, the text and the log are left
//! alone.  Unrecognised events from a newer SDK are logged and otherwise
//! ignored.

use mpos_core::{ConnectionState, DeviceInfo, SdkConnectionEvent};
use tracing::{debug, info, warn};

use crate::application::activity_log::ActivityLog;

pub struct DeviceSessionProjector {
    product_prefix: String,
    state: ConnectionState,
    connection_text: String,
    discovered: Vec<DeviceInfo>,
}

impl DeviceSessionProjector {
    /// `product_prefix` selects which advertised readers are shown.
    pub fn new(product_prefix: impl Into<String>) -> Self {
        let state = ConnectionState::Disconnected;
        Self {
            product_prefix: product_prefix.into(),
            connection_text: state.to_string(),
            state,
            discovered: Vec::new(),
        }
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// "Connected to: <name>", "Disconnected" or "Connection error: <reason>".
    pub fn connection_text(&self) -> &str {
        &self.connection_text
    }

    /// Readers accepted since discovery was last opened, in arrival order.
    pub fn discovered(&self) -> &[DeviceInfo] {
        &self.discovered
    }

    /// Starts a fresh discovery list.
    pub fn open_discovery(&mut self) {
        self.discovered.clear();
    }

    /// Dismisses the discovery list.
    pub fn close_discovery(&mut self) {
        self.discovered.clear();
    }

    /// Looks up a discovered reader by id.
    pub fn find(&self, device_id: &str) -> Option<&DeviceInfo> {
        self.discovered.iter().find(|d| d.device_id == device_id)
    }

    /// Adds `device` if it belongs to the supported product family.
    ///
    /// Returns `true` when the device was added; duplicates refresh the
    /// stored name but keep their position.
    pub fn on_device_discovered(&mut self, device: DeviceInfo) -> bool {
        if !device.matches_prefix(&self.product_prefix) {
            debug!(device_id = %device.device_id, name = ?device.name, "ignoring unsupported reader");
            return false;
        }
        if let Some(existing) = self
            .discovered
            .iter_mut()
            .find(|d| d.device_id == device.device_id)
        {
            *existing = device;
            return false;
        }
        debug!(device_id = %device.device_id, "reader discovered");
        self.discovered.push(device);
        true
    }

    pub fn on_connection_event(&mut self, event: SdkConnectionEvent, log: &mut ActivityLog) {
        match event {
            SdkConnectionEvent::Connecting | SdkConnectionEvent::Initializing => {
                debug!(?event, "reader not yet connected");
                self.state = ConnectionState::Connecting;
            }
            SdkConnectionEvent::Connected(device) => {
                let display_name = device.display_name().to_string();
                info!(device_id = %device.device_id, name = %display_name, "reader connected");
                log.append(format!("Connected: {display_name}"));
                self.set_state(ConnectionState::Connected {
                    device_id: device.device_id,
                    display_name,
                });
            }
            SdkConnectionEvent::Disconnected => {
                info!("reader disconnected");
                log.append("Device disconnected");
                self.set_state(ConnectionState::Disconnected);
            }
            SdkConnectionEvent::Error(reason) => {
                warn!(%reason, "reader connection error");
                log.append(format!("Device connection error: {reason}"));
                self.set_state(ConnectionState::Error(reason));
            }
            SdkConnectionEvent::Unknown(label) => {
                warn!(%label, "unhandled connection event");
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.connection_text = state.to_string();
        self.state = state;
    }
}
