//! A simulated card reader implementing the payment SDK port.
//!
//! Behaves like the vendor SDK from the terminal's point of view: every call
//! returns immediately and results are reported later from a background
//! thread the terminal does not own.
//!
//! - `start_scan` advertises a fixed catalogue of readers, one per step.
//! - `connect_device` walks through `Connecting → Initializing → Connected`.
//! - `start_transaction` prompts for a card, reports `ReadingCard`,
//!   `ProcessingCard`, card removal, then approves with a fresh transfer id.
//!   A zero amount is declined.
//! - `stop_current_operation` silences the running operation between steps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use mpos_core::{DeviceError, DeviceInfo, MinorUnits, SdkConnectionEvent, TransactionRequest};
use tracing::debug;
use uuid::Uuid;

use crate::application::payment_sdk::{
    DeviceEvent, EventSender, PaymentSdk, ReaderStatus, ReaderUpdate, SdkConfig,
    TransactionReporter,
};

/// Default pause between two simulated reader reports.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(300);

/// Readers advertised by [`SimulatedReader`] unless told otherwise.
pub fn demo_catalogue() -> Vec<DeviceInfo> {
    vec![
        DeviceInfo {
            device_id: "DV-0042".to_string(),
            name: Some("D135-0042".to_string()),
        },
        DeviceInfo {
            device_id: "DV-7001".to_string(),
            name: Some("OtherReader".to_string()),
        },
        DeviceInfo {
            device_id: "DV-0077".to_string(),
            name: Some("d135-0077".to_string()),
        },
    ]
}

pub struct SimulatedReader {
    events: EventSender,
    catalogue: Vec<DeviceInfo>,
    step_delay: Duration,
    connected: Arc<Mutex<Option<DeviceInfo>>>,
    /// Bumped by every new operation and by `stop_current_operation`; a
    /// background thread stops reporting once its ticket is outdated.
    operation: Arc<AtomicU64>,
}

impl SimulatedReader {
    pub fn new(events: EventSender, catalogue: Vec<DeviceInfo>) -> Self {
        Self {
            events,
            catalogue,
            step_delay: DEFAULT_STEP_DELAY,
            connected: Arc::new(Mutex::new(None)),
            operation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    fn connected(&self) -> MutexGuard<'_, Option<DeviceInfo>> {
        self.connected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PaymentSdk for SimulatedReader {
    fn start_scan(&self) -> Result<(), DeviceError> {
        let events = self.events.clone();
        let catalogue = self.catalogue.clone();
        let delay = self.step_delay;
        thread::spawn(move || {
            for device in catalogue {
                thread::sleep(delay);
                if !events.device(DeviceEvent::Discovered(device)) {
                    return;
                }
            }
        });
        Ok(())
    }

    fn connect_device(&self, device_id: &str) -> Result<(), DeviceError> {
        let device = self
            .catalogue
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned()
            .ok_or_else(|| DeviceError::new(format!("reader {device_id} is out of range")))?;

        let events = self.events.clone();
        let connected = Arc::clone(&self.connected);
        let delay = self.step_delay;
        thread::spawn(move || {
            for step in [SdkConnectionEvent::Connecting, SdkConnectionEvent::Initializing] {
                events.device(DeviceEvent::Connection(step));
                thread::sleep(delay);
            }
            *connected
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(device.clone());
            events.device(DeviceEvent::Connection(SdkConnectionEvent::Connected(device)));
        });
        Ok(())
    }

    fn disconnect_device(&self) -> Result<(), DeviceError> {
        if self.connected().take().is_none() {
            return Err(DeviceError::new("no reader connected"));
        }
        self.operation.fetch_add(1, Ordering::SeqCst);
        self.events
            .device(DeviceEvent::Connection(SdkConnectionEvent::Disconnected));
        Ok(())
    }

    fn stop_current_operation(&self) {
        self.operation.fetch_add(1, Ordering::SeqCst);
    }

    fn update(&self, config: &SdkConfig) -> Result<(), DeviceError> {
        debug!(
            "simulated reader configured for {} (merchant {:?})",
            config.environment, config.merchant_id
        );
        Ok(())
    }

    fn start_transaction(
        &self,
        request: TransactionRequest,
        reporter: TransactionReporter,
    ) -> Result<(), DeviceError> {
        if self.connected().is_none() {
            return Err(DeviceError::new("no reader connected"));
        }

        let ticket = self.operation.fetch_add(1, Ordering::SeqCst) + 1;
        let operation = Arc::clone(&self.operation);
        let delay = self.step_delay;
        let outcome = if request.amount == MinorUnits(0) {
            ReaderStatus::Failed {
                error: "Amount must be greater than zero".to_string(),
            }
        } else {
            ReaderStatus::Approved {
                transfer_id: format!("TR{}", Uuid::new_v4().simple()),
            }
        };

        thread::spawn(move || {
            let steps = [
                ReaderUpdate::Prompt("Insert, tap or swipe card".to_string()),
                ReaderUpdate::Status(ReaderStatus::ReadingCard),
                ReaderUpdate::Status(ReaderStatus::ProcessingCard),
                ReaderUpdate::CardRemoved,
                ReaderUpdate::Status(outcome),
            ];
            for update in steps {
                thread::sleep(delay);
                if operation.load(Ordering::SeqCst) != ticket {
                    return;
                }
                reporter.report(update);
            }
        });
        Ok(())
    }
}
