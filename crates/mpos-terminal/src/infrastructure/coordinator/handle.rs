//! The cloneable handle the UI uses to talk to the coordinator.

use mpos_core::{DeviceError, Generation, TransactionKind, ValidationError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use super::projection::Projection;
use crate::application::edit_session::{EnvironmentEdit, OthersEdit};
use crate::application::run_transaction::TransactionError;
use crate::infrastructure::storage::session_store::StorageError;

/// Errors returned to callers of [`TerminalHandle`].
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("reader {0} is not in the discovered list")]
    UnknownDevice(String),

    #[error("terminal coordinator has stopped")]
    Stopped,
}

impl TerminalError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            TerminalError::Transaction(e) => e.user_message(),
            TerminalError::Validation(e) => e.user_message(),
            TerminalError::Storage(e) => e.user_message().to_string(),
            TerminalError::Device(e) => e.reason.clone(),
            TerminalError::UnknownDevice(_) => "That reader is no longer available".to_string(),
            TerminalError::Stopped => "The terminal is not running".to_string(),
        }
    }
}

pub(super) type Reply<T> = oneshot::Sender<Result<T, TerminalError>>;

/// Requests handled by the coordinator task, each with its reply channel.
pub(super) enum Command {
    StartTransaction {
        kind: TransactionKind,
        amount_text: String,
        reply: Reply<Generation>,
    },
    CancelTransaction { reply: Reply<()> },
    StartScan { reply: Reply<()> },
    CloseDeviceList { reply: Reply<()> },
    SelectDevice { device_id: String, reply: Reply<()> },
    Disconnect { reply: Reply<()> },
    SaveConfiguration { edit: EnvironmentEdit, reply: Reply<()> },
    SaveOthers { edit: OthersEdit, reply: Reply<()> },
    RestoreDefaults { reply: Reply<()> },
    ClearLogs { reply: Reply<()> },
}

/// Cloneable front door to a running coordinator.
///
/// Every method sends one command and waits for its reply.  By the time a
/// reply arrives, [`projection`](Self::projection) already reflects the
/// command's effect.
#[derive(Clone)]
pub struct TerminalHandle {
    commands: mpsc::Sender<Command>,
    projection: watch::Receiver<Projection>,
}

impl TerminalHandle {
    pub(super) fn new(commands: mpsc::Sender<Command>, projection: watch::Receiver<Projection>) -> Self {
        Self {
            commands,
            projection,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, TerminalError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TerminalError::Stopped)?;
        response.await.map_err(|_| TerminalError::Stopped)?
    }

    /// Submits a transaction.  Returns once the SDK has accepted it; the
    /// status then moves as the reader reports.
    pub async fn start_transaction(
        &self,
        kind: TransactionKind,
        amount_text: impl Into<String>,
    ) -> Result<Generation, TerminalError> {
        let amount_text = amount_text.into();
        self.request(|reply| Command::StartTransaction {
            kind,
            amount_text,
            reply,
        })
        .await
    }

    pub async fn cancel_transaction(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::CancelTransaction { reply }).await
    }

    /// Opens a fresh discovery list and starts scanning.
    pub async fn start_scan(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::StartScan { reply }).await
    }

    /// Dismisses the discovery list, clearing it.
    pub async fn close_device_list(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::CloseDeviceList { reply }).await
    }

    /// Connects to a reader from the discovery list.
    pub async fn select_device(&self, device_id: impl Into<String>) -> Result<(), TerminalError> {
        let device_id = device_id.into();
        self.request(|reply| Command::SelectDevice { device_id, reply })
            .await
    }

    pub async fn disconnect(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Saves one environment's configuration, selects it and reconfigures
    /// the SDK.
    pub async fn save_configuration(&self, edit: EnvironmentEdit) -> Result<(), TerminalError> {
        self.request(|reply| Command::SaveConfiguration { edit, reply })
            .await
    }

    /// Validates and saves the tags and split-transfer settings.
    pub async fn save_others(&self, edit: OthersEdit) -> Result<(), TerminalError> {
        self.request(|reply| Command::SaveOthers { edit, reply }).await
    }

    pub async fn restore_defaults(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::RestoreDefaults { reply }).await
    }

    pub async fn clear_logs(&self) -> Result<(), TerminalError> {
        self.request(|reply| Command::ClearLogs { reply }).await
    }

    /// The latest published snapshot.
    pub fn projection(&self) -> Projection {
        self.projection.borrow().clone()
    }

    /// A receiver that is notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Projection> {
        self.projection.clone()
    }

    /// Waits until a published snapshot satisfies `predicate` (the current
    /// one included) and returns it.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Projection) -> bool,
    ) -> Result<Projection, TerminalError> {
        let mut rx = self.projection.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| TerminalError::Stopped)?;
        Ok(snapshot.clone())
    }
}
