//! The terminal coordinator: the single task that owns all mutable state.
//!
//! # Why one task? (for beginners)
//!
//! Three sources change terminal state concurrently:
//!
//! - the UI (button presses, settings saves),
//! - the payment SDK (status, discovery and connection reports, delivered
//!   from threads the terminal does not own),
//! - the automatic reset timer.
//!
//! Rather than guarding each piece of state with a lock, one tokio task owns
//! the session, the transaction orchestrator, the device projector and the
//! activity log outright.  Everything else talks to it through channels:
//!
//! ```text
//!  TerminalHandle ──(mpsc: Command + oneshot reply)──┐
//!                                                    ▼
//!  SDK threads ─────(mpsc: InboundEvent)──────► Coordinator::run ──► watch<Projection> ──► UI
//!                                                    ▲
//!  reset timer ─────(InboundEvent::ResetElapsed)─────┘
//! ```
//!
//! Commands and events are handled strictly one at a time, so no two
//! mutations can interleave.  After each one a fresh [`Projection`] is
//! published; command replies are sent only after that, so a caller that got
//! its reply always sees the matching snapshot.

mod handle;
mod projection;

pub use handle::{TerminalError, TerminalHandle};
pub use projection::Projection;

use std::sync::Arc;
use std::time::Duration;

use mpos_core::{
    AllEnvironmentConfigurations, DeviceError, Generation, SdkConnectionEvent, UserSessionData,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::activity_log::ActivityLog;
use crate::application::edit_session::{apply_environment_edit, apply_others_edit, restore_defaults};
use crate::application::payment_sdk::{
    DeviceEvent, EventSender, InboundEvent, PaymentSdk, SdkConfig,
};
use crate::application::run_transaction::{Effect, TransactionError, TransactionOrchestrator};
use crate::application::track_devices::DeviceSessionProjector;
use crate::infrastructure::storage::session_store::ConfigStore;
use handle::{Command, Reply};

/// Commands waiting beyond this many make `TerminalHandle` calls wait.
const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Everything the coordinator needs, injected at construction time.
pub struct TerminalParts {
    pub sdk: Arc<dyn PaymentSdk>,
    /// Sending half of the inbound channel; also handed to the SDK.
    pub events: EventSender,
    pub inbound: mpsc::UnboundedReceiver<InboundEvent>,
    pub store: ConfigStore,
    /// Environment configuration used by "restore defaults".
    pub defaults: AllEnvironmentConfigurations,
    /// Reader family shown during discovery.
    pub device_name_prefix: String,
}

pub struct Coordinator {
    sdk: Arc<dyn PaymentSdk>,
    events: EventSender,
    store: ConfigStore,
    defaults: AllEnvironmentConfigurations,
    session: Arc<UserSessionData>,
    orchestrator: TransactionOrchestrator,
    devices: DeviceSessionProjector,
    log: ActivityLog,
    reset_timer: Option<JoinHandle<()>>,
    projection: watch::Sender<Projection>,
}

impl Coordinator {
    /// Loads the stored session, configures the SDK and starts the
    /// coordinator task.
    ///
    /// The task runs until every [`TerminalHandle`] has been dropped.
    pub async fn spawn(parts: TerminalParts) -> (TerminalHandle, JoinHandle<()>) {
        let TerminalParts {
            sdk,
            events,
            inbound,
            store,
            defaults,
            device_name_prefix,
        } = parts;

        let session = Arc::new(store.load(&defaults).await);
        let orchestrator = TransactionOrchestrator::new(Arc::clone(&sdk), events.clone());
        let devices = DeviceSessionProjector::new(device_name_prefix);
        let (projection, projection_rx) = watch::channel(Projection {
            transaction_status: orchestrator.status().clone(),
            in_flight: None,
            connection_state: devices.connection_state().clone(),
            connection_text: devices.connection_text().to_string(),
            log: Vec::new(),
            discovered_devices: Vec::new(),
            last_transfer_id: None,
            session: Arc::clone(&session),
        });

        let mut coordinator = Self {
            sdk,
            events,
            store,
            defaults,
            session,
            orchestrator,
            devices,
            log: ActivityLog::new(),
            reset_timer: None,
            projection,
        };
        coordinator.reconfigure_sdk();
        coordinator.publish();

        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let task = tokio::spawn(coordinator.run(command_rx, inbound));
        (TerminalHandle::new(commands, projection_rx), task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut inbound: mpsc::UnboundedReceiver<InboundEvent>,
    ) {
        info!("terminal coordinator started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = inbound.recv() => {
                    self.handle_event(event);
                    self.publish();
                }
            }
        }
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
        info!("terminal coordinator stopped");
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartTransaction {
                kind,
                amount_text,
                reply,
            } => {
                let result = self
                    .orchestrator
                    .start_transaction(kind, &amount_text, &self.session, &mut self.log)
                    .map_err(TerminalError::from);
                self.respond(reply, result);
            }
            Command::CancelTransaction { reply } => {
                let result = self
                    .orchestrator
                    .cancel(&mut self.log)
                    .map_err(TerminalError::from);
                self.respond(reply, result);
            }
            Command::StartScan { reply } => {
                self.devices.open_discovery();
                self.log.append("Scanning for devices...");
                let result = self.sdk.start_scan().map_err(|e| self.device_failure(e));
                self.respond(reply, result);
            }
            Command::CloseDeviceList { reply } => {
                self.devices.close_discovery();
                self.respond(reply, Ok(()));
            }
            Command::SelectDevice { device_id, reply } => {
                let result = self.select_device(device_id);
                self.respond(reply, result);
            }
            Command::Disconnect { reply } => {
                let result = self
                    .sdk
                    .disconnect_device()
                    .map_err(|e| self.device_failure(e));
                self.respond(reply, result);
            }
            Command::SaveConfiguration { edit, reply } => {
                let updated = apply_environment_edit(&self.session, edit);
                let result = self.commit(updated).await.map(|()| {
                    self.reconfigure_sdk();
                    self.log.append("Configuration saved");
                });
                self.respond(reply, result);
            }
            Command::SaveOthers { edit, reply } => {
                let result = match apply_others_edit(&self.session, edit) {
                    Ok(updated) => self.commit(updated).await,
                    Err(e) => {
                        debug!("settings rejected: {e}");
                        Err(e.into())
                    }
                };
                if result.is_ok() {
                    self.log.append("Settings saved");
                }
                self.respond(reply, result);
            }
            Command::RestoreDefaults { reply } => {
                let updated = restore_defaults(&self.session, &self.defaults);
                let result = self.commit(updated).await.map(|()| {
                    self.reconfigure_sdk();
                    self.log.append("Default configuration restored");
                });
                self.respond(reply, result);
            }
            Command::ClearLogs { reply } => {
                self.log.clear();
                self.respond(reply, Ok(()));
            }
        }
    }

    fn select_device(&mut self, device_id: String) -> Result<(), TerminalError> {
        let Some(device) = self.devices.find(&device_id).cloned() else {
            warn!("select for unknown reader {device_id}");
            return Err(TerminalError::UnknownDevice(device_id));
        };
        self.devices.close_discovery();
        info!("connecting to reader {} ({})", device.display_name(), device.device_id);
        self.log
            .append(format!("Connecting to device: {}...", device.display_name()));
        self.sdk
            .connect_device(&device.device_id)
            .map_err(|e| self.device_failure(e))
    }

    /// Persists `updated` and, only on success, makes it the live session.
    async fn commit(&mut self, updated: UserSessionData) -> Result<(), TerminalError> {
        if let Err(e) = self.store.save(&updated).await {
            error!("failed to save session: {e}");
            self.log.append(e.user_message());
            return Err(e.into());
        }
        self.session = Arc::new(updated);
        Ok(())
    }

    fn reconfigure_sdk(&mut self) {
        let config = SdkConfig::from(&self.session.all_configs);
        if let Err(e) = self.sdk.update(&config) {
            warn!("SDK rejected configuration for {}: {e}", config.environment);
            self.log.append(format!("Device error: {}", e.reason));
        }
    }

    fn device_failure(&mut self, e: DeviceError) -> TerminalError {
        warn!("device operation failed: {e}");
        self.log.append(format!("Device error: {}", e.reason));
        TerminalError::Device(e)
    }

    fn respond<T>(&self, reply: Reply<T>, result: Result<T, TerminalError>) {
        self.publish();
        if reply.send(result).is_err() {
            debug!("caller dropped before the reply was sent");
        }
    }

    // ── Inbound events ────────────────────────────────────────────────────────

    fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Transaction { generation, update } => {
                match self.orchestrator.on_update(generation, update, &mut self.log) {
                    Ok(Effect::ScheduleReset { generation, after }) => {
                        self.schedule_reset(generation, after);
                    }
                    Ok(Effect::None) => {}
                    Err(TransactionError::StaleCallback(g)) => {
                        debug!("discarded update for superseded transaction {g}");
                    }
                    Err(e) => warn!("transaction update failed: {e}"),
                }
            }
            InboundEvent::Device(DeviceEvent::Discovered(device)) => {
                self.devices.on_device_discovered(device);
            }
            InboundEvent::Device(DeviceEvent::Connection(event)) => {
                let lost = match &event {
                    SdkConnectionEvent::Disconnected => Some("Device disconnected".to_string()),
                    SdkConnectionEvent::Error(reason) => {
                        Some(format!("Device connection error: {reason}"))
                    }
                    _ => None,
                };
                self.devices.on_connection_event(event, &mut self.log);
                if let Some(reason) = lost {
                    if let Some(Effect::ScheduleReset { generation, after }) =
                        self.orchestrator.on_reader_lost(&reason, &mut self.log)
                    {
                        self.schedule_reset(generation, after);
                    }
                }
            }
            InboundEvent::ResetElapsed { generation } => {
                if self.orchestrator.on_reset_elapsed(generation) {
                    debug!("transaction {generation} reset to idle");
                }
            }
        }
    }

    fn schedule_reset(&mut self, generation: Generation, after: Duration) {
        if let Some(previous) = self.reset_timer.take() {
            previous.abort();
        }
        let events = self.events.clone();
        self.reset_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            events.send(InboundEvent::ResetElapsed { generation });
        }));
    }

    fn publish(&self) {
        self.projection.send_replace(Projection {
            transaction_status: self.orchestrator.status().clone(),
            in_flight: self.orchestrator.in_flight(),
            connection_state: self.devices.connection_state().clone(),
            connection_text: self.devices.connection_text().to_string(),
            log: self.log.lines().to_vec(),
            discovered_devices: self.devices.discovered().to_vec(),
            last_transfer_id: self.orchestrator.last_transfer_id().map(str::to_string),
            session: Arc::clone(&self.session),
        });
    }
}
