//! Read-only snapshot of terminal state published to the UI.

use std::sync::Arc;

use mpos_core::{ConnectionState, DeviceInfo, Generation, TransactionStatus, UserSessionData};

use crate::application::activity_log::LogLine;

/// Everything the UI renders, captured after each handled command or event.
///
/// Snapshots are immutable values; the UI never holds a reference into the
/// coordinator's state.
#[derive(Debug, Clone)]
pub struct Projection {
    pub transaction_status: TransactionStatus,
    /// Attempt waiting for reader reports, if any.
    pub in_flight: Option<Generation>,
    pub connection_state: ConnectionState,
    pub connection_text: String,
    pub log: Vec<LogLine>,
    pub discovered_devices: Vec<DeviceInfo>,
    pub last_transfer_id: Option<String>,
    pub session: Arc<UserSessionData>,
}

impl Projection {
    /// Messages of the activity log, oldest first.
    pub fn log_messages(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(|line| line.message.as_str())
    }
}
