//! UI command bridge: exposes terminal operations to the presentation layer.
//!
//! Every function here takes the [`TerminalHandle`] and returns a
//! [`CommandResult<T>`] of plain serialisable DTOs, so a desktop or web shell
//! can forward calls straight from its IPC layer:
//!
//! ```js
//! const result = await invoke("start_transaction", { kind: "sale", amount: "3.14" });
//! if (!result.success) showError(result.error);
//! ```
//!
//! # Data Transfer Objects (DTOs)
//!
//! Internal types (`Uuid`, `Environment`, `TransactionStatus`, chrono
//! timestamps) never cross this boundary.  DTOs carry only strings, numbers
//! and booleans, and mirror the interfaces the UI declares on its side.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>`, so every
//! response has the same shape: `{ success: bool, data: T | null, error:
//! string | null }`.  `error` is always a user-facing message.

use mpos_core::{
    DeviceInfo, Environment, SplitTransferEntry, TransactionKind, TransactionStatus,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::application::activity_log::LogLine;
use crate::application::edit_session::{EnvironmentEdit, OthersEdit};
use crate::infrastructure::coordinator::{Projection, TerminalError, TerminalHandle};

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// Transaction and connection status shown on the main screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    /// `idle`, `reading_card`, `processing_card`, `success` or `failed`.
    pub transaction_status: String,
    /// Transfer id on success, error text on failure.
    pub detail: Option<String>,
    pub connection_text: String,
    pub connected: bool,
    pub last_transfer_id: Option<String>,
}

impl From<&Projection> for StatusDto {
    fn from(p: &Projection) -> Self {
        let detail = match &p.transaction_status {
            TransactionStatus::Success(id) => Some(id.clone()),
            TransactionStatus::Failed(error) => Some(error.clone()),
            _ => None,
        };
        Self {
            transaction_status: p.transaction_status.label().to_string(),
            detail,
            connection_text: p.connection_text.clone(),
            connected: p.connection_state.is_connected(),
            last_transfer_id: p.last_transfer_id.clone(),
        }
    }
}

/// One activity log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLineDto {
    /// RFC 3339 timestamp.
    pub at: String,
    pub message: String,
}

impl From<&LogLine> for LogLineDto {
    fn from(line: &LogLine) -> Self {
        Self {
            at: line.at.to_rfc3339(),
            message: line.message.clone(),
        }
    }
}

/// A discovered reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub device_id: String,
    pub name: String,
}

impl From<&DeviceInfo> for DeviceDto {
    fn from(d: &DeviceInfo) -> Self {
        Self {
            device_id: d.device_id.clone(),
            name: d.display_name().to_string(),
        }
    }
}

/// The configuration form for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDto {
    /// Environment token: `Production`, `Sandbox` or `QA`.
    pub environment: String,
    pub username: String,
    pub password: String,
    pub merchant_id: String,
    pub merchant_mid: String,
    pub device_id: String,
    pub buyer_identity_id: Option<String>,
}

impl From<EnvironmentEdit> for ConfigurationDto {
    fn from(edit: EnvironmentEdit) -> Self {
        Self {
            environment: edit.environment.token().to_string(),
            username: edit.username,
            password: edit.password,
            merchant_id: edit.merchant_id,
            merchant_mid: edit.merchant_mid,
            device_id: edit.device_id,
            buyer_identity_id: edit.buyer_identity_id,
        }
    }
}

/// One split-transfer leg on the "others" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTransferDto {
    /// Empty for a leg the UI created itself; a fresh id is assigned.
    pub id: String,
    pub merchant_id: String,
    pub amount: String,
    pub fee: String,
    pub tags: String,
}

impl From<&SplitTransferEntry> for SplitTransferDto {
    fn from(e: &SplitTransferEntry) -> Self {
        Self {
            id: e.id.to_string(),
            merchant_id: e.merchant_id.clone(),
            amount: e.amount.clone(),
            fee: e.fee.clone(),
            tags: e.tags.clone(),
        }
    }
}

impl From<SplitTransferDto> for SplitTransferEntry {
    fn from(dto: SplitTransferDto) -> Self {
        Self {
            id: Uuid::parse_str(&dto.id).unwrap_or_else(|_| Uuid::new_v4()),
            merchant_id: dto.merchant_id,
            amount: dto.amount,
            fee: dto.fee,
            tags: dto.tags,
        }
    }
}

/// The "others" form: global tags and split transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OthersDto {
    pub tags: String,
    pub enable_split_transfers: bool,
    pub split_transfers: Vec<SplitTransferDto>,
}

impl From<&OthersEdit> for OthersDto {
    fn from(edit: &OthersEdit) -> Self {
        Self {
            tags: edit.tags_string.clone(),
            enable_split_transfers: edit.enable_split_transfers,
            split_transfers: edit
                .split_transfer_entries
                .iter()
                .map(SplitTransferDto::from)
                .collect(),
        }
    }
}

impl From<OthersDto> for OthersEdit {
    fn from(dto: OthersDto) -> Self {
        Self {
            enable_split_transfers: dto.enable_split_transfers,
            split_transfer_entries: dto
                .split_transfers
                .into_iter()
                .map(SplitTransferEntry::from)
                .collect(),
            tags_string: dto.tags,
        }
    }
}

/// Unified response wrapper used by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize> From<Result<T, TerminalError>> for CommandResult<T> {
    fn from(result: Result<T, TerminalError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                warn!("command failed: {e}");
                Self::err(e.user_message())
            }
        }
    }
}

// ── Queries ───────────────────────────────────────────────────────────────────

pub fn get_status(handle: &TerminalHandle) -> CommandResult<StatusDto> {
    CommandResult::ok(StatusDto::from(&handle.projection()))
}

pub fn get_logs(handle: &TerminalHandle) -> CommandResult<Vec<LogLineDto>> {
    CommandResult::ok(handle.projection().log.iter().map(LogLineDto::from).collect())
}

pub fn get_devices(handle: &TerminalHandle) -> CommandResult<Vec<DeviceDto>> {
    CommandResult::ok(
        handle
            .projection()
            .discovered_devices
            .iter()
            .map(DeviceDto::from)
            .collect(),
    )
}

/// Returns the configuration form for `environment`, or for the selected
/// environment when `None`.
pub fn get_configuration(
    handle: &TerminalHandle,
    environment: Option<String>,
) -> CommandResult<ConfigurationDto> {
    let session = handle.projection().session;
    let environment = match environment {
        Some(token) => match token.parse::<Environment>() {
            Ok(env) => env,
            Err(e) => return CommandResult::err(e.to_string()),
        },
        None => session.all_configs.selected_environment,
    };
    CommandResult::ok(EnvironmentEdit::from_session(&session, environment).into())
}

pub fn get_others(handle: &TerminalHandle) -> CommandResult<OthersDto> {
    let session = handle.projection().session;
    CommandResult::ok(OthersDto::from(&OthersEdit::from_session(&session)))
}

// ── Form helpers ──────────────────────────────────────────────────────────────

/// Appends an empty split-transfer leg to an unsaved form.
pub fn add_split_transfer(form: OthersDto) -> CommandResult<OthersDto> {
    let mut edit = OthersEdit::from(form);
    edit.add_entry();
    CommandResult::ok(OthersDto::from(&edit))
}

/// Removes the leg with `id` from an unsaved form.
pub fn remove_split_transfer(form: OthersDto, id: String) -> CommandResult<OthersDto> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return CommandResult::err(format!("invalid transfer id: {id}"));
    };
    let mut edit = OthersEdit::from(form);
    if !edit.remove_entry(id) {
        return CommandResult::err("That transfer no longer exists");
    }
    CommandResult::ok(OthersDto::from(&edit))
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Starts a `sale`, `auth` or `refund`.  Returns the transaction generation.
pub async fn start_transaction(
    handle: &TerminalHandle,
    kind: String,
    amount: String,
) -> CommandResult<u64> {
    let kind = match kind.parse::<TransactionKind>() {
        Ok(kind) => kind,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    handle
        .start_transaction(kind, amount)
        .await
        .map(|generation| generation.0)
        .into()
}

pub async fn cancel_transaction(handle: &TerminalHandle) -> CommandResult<()> {
    handle.cancel_transaction().await.into()
}

pub async fn scan_for_devices(handle: &TerminalHandle) -> CommandResult<()> {
    handle.start_scan().await.into()
}

pub async fn close_device_list(handle: &TerminalHandle) -> CommandResult<()> {
    handle.close_device_list().await.into()
}

pub async fn select_device(handle: &TerminalHandle, device_id: String) -> CommandResult<()> {
    handle.select_device(device_id).await.into()
}

pub async fn disconnect_device(handle: &TerminalHandle) -> CommandResult<()> {
    handle.disconnect().await.into()
}

pub async fn save_configuration(
    handle: &TerminalHandle,
    form: ConfigurationDto,
) -> CommandResult<()> {
    let environment = match form.environment.parse::<Environment>() {
        Ok(env) => env,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    let edit = EnvironmentEdit {
        environment,
        username: form.username,
        password: form.password,
        merchant_id: form.merchant_id,
        merchant_mid: form.merchant_mid,
        device_id: form.device_id,
        buyer_identity_id: form.buyer_identity_id,
    };
    handle.save_configuration(edit).await.into()
}

pub async fn save_others(handle: &TerminalHandle, form: OthersDto) -> CommandResult<()> {
    handle.save_others(form.into()).await.into()
}

pub async fn restore_defaults(handle: &TerminalHandle) -> CommandResult<()> {
    handle.restore_defaults().await.into()
}

pub async fn clear_logs(handle: &TerminalHandle) -> CommandResult<()> {
    handle.clear_logs().await.into()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
