//! The payment SDK port and the events it reports back.
//!
//! # Why a port? (for beginners)
//!
//! The vendor SDK is an opaque, callback-driven component: it delivers
//! discovery results, connection changes and transaction status updates on
//! threads it owns, in whatever order its internals produce them.  The use
//! cases never talk to it directly.  They call the [`PaymentSdk`] trait, and
//! the SDK reports back by posting [`InboundEvent`]s into a channel that the
//! terminal coordinator drains on its own task.
//!
//! ```text
//!  coordinator task ──► PaymentSdk::start_transaction(request, reporter)
//!                                   │
//!                     SDK threads ──┘ reporter.report(ReaderUpdate::…)
//!                                   │
//!  coordinator task ◄── InboundEvent::Transaction { generation, update }
//! ```
//!
//! Every transaction callback is tagged with the [`Generation`] it was issued
//! for, so a result that arrives after the attempt was superseded or
//! cancelled can be recognised and discarded.
//!
//! In production an FFI binding implements this trait; the terminal ships a
//! simulated reader for local runs, and the tests use a `mockall` mock.

use mpos_core::{
    AllEnvironmentConfigurations, DeviceError, DeviceInfo, Environment, Generation,
    SdkConnectionEvent, TransactionRequest,
};
use tokio::sync::mpsc;

// ── SDK configuration ─────────────────────────────────────────────────────────

/// The subset of the session the SDK is (re)configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    pub environment: Environment,
    pub username: String,
    pub password: String,
    pub merchant_id: String,
    pub merchant_mid: String,
    pub device_id: String,
}

impl From<&AllEnvironmentConfigurations> for SdkConfig {
    /// Takes the credentials of the currently selected environment.
    fn from(all: &AllEnvironmentConfigurations) -> Self {
        let selected = all.selected();
        Self {
            environment: all.selected_environment,
            username: selected.username,
            password: selected.password,
            merchant_id: selected.merchant_id,
            merchant_mid: selected.merchant_mid,
            device_id: selected.device_id,
        }
    }
}

// ── Inbound events ────────────────────────────────────────────────────────────

/// Transaction status reported by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderStatus {
    ReadingCard,
    ProcessingCard,
    Approved { transfer_id: String },
    Failed { error: String },
}

/// Everything the reader can say about an in-flight transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderUpdate {
    Status(ReaderStatus),
    /// A prompt for the cardholder ("Insert, tap or swipe card").
    Prompt(String),
    CardRemoved,
}

/// Discovery and connection reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Discovered(DeviceInfo),
    Connection(SdkConnectionEvent),
}

/// A message delivered to the coordinator task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Transaction {
        generation: Generation,
        update: ReaderUpdate,
    },
    Device(DeviceEvent),
    /// The automatic reset timer for `generation` fired.
    ResetElapsed { generation: Generation },
}

// ── Channel handles ───────────────────────────────────────────────────────────

/// Sending half of the inbound event channel.
///
/// Cheap to clone and safe to use from any thread: sending on an unbounded
/// tokio channel never blocks and needs no runtime context.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventSender {
    /// Creates the inbound channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Posts an event.  Returns `false` once the coordinator has stopped.
    pub fn send(&self, event: InboundEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn device(&self, event: DeviceEvent) -> bool {
        self.send(InboundEvent::Device(event))
    }

    /// Returns a reporter bound to one transaction attempt.
    pub fn reporter(&self, generation: Generation) -> TransactionReporter {
        TransactionReporter {
            generation,
            events: self.clone(),
        }
    }
}

/// Callback handle given to the SDK with each transaction.
///
/// Every update it posts is tagged with the attempt's generation.
#[derive(Debug, Clone)]
pub struct TransactionReporter {
    generation: Generation,
    events: EventSender,
}

impl TransactionReporter {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn report(&self, update: ReaderUpdate) -> bool {
        self.events.send(InboundEvent::Transaction {
            generation: self.generation,
            update,
        })
    }
}

// ── Port ──────────────────────────────────────────────────────────────────────

/// Operations the terminal issues to the payment SDK.
///
/// Calls return as soon as the SDK has accepted the request; outcomes are
/// reported later through [`EventSender`] / [`TransactionReporter`].
#[cfg_attr(test, mockall::automock)]
pub trait PaymentSdk: Send + Sync {
    /// Starts reader discovery.  Results arrive as [`DeviceEvent::Discovered`].
    fn start_scan(&self) -> Result<(), DeviceError>;

    fn connect_device(&self, device_id: &str) -> Result<(), DeviceError>;

    fn disconnect_device(&self) -> Result<(), DeviceError>;

    /// Asks the reader to abandon the current operation.  Fire-and-forget.
    fn stop_current_operation(&self);

    /// Reconfigures the SDK with new credentials.
    fn update(&self, config: &SdkConfig) -> Result<(), DeviceError>;

    fn start_transaction(
        &self,
        request: TransactionRequest,
        reporter: TransactionReporter,
    ) -> Result<(), DeviceError>;
}
