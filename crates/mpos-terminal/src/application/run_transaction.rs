//! TransactionOrchestrator: the transaction lifecycle state machine.
//!
//! # Who moves the status? (for beginners)
//!
//! Pressing "Sale" does **not** change the visible status.  The orchestrator
//! validates the amount, builds the request, hands it to the SDK and records
//! which attempt is now in flight.  Only the reader's own status reports move
//! the status:
//!
//! ```text
//!  ReaderStatus::ReadingCard     ──►  ReadingCard
//!  ReaderStatus::ProcessingCard  ──►  ProcessingCard
//!  ReaderStatus::Approved        ──►  Success(transfer_id)  ─┐
//!  ReaderStatus::Failed          ──►  Failed(error)         ─┤
//!                                                            ▼
//!                                  Idle, after AUTO_RESET_DELAY
//! ```
//!
//! # Generations
//!
//! Each accepted start is assigned a fresh [`Generation`].  Updates tagged
//! with any generation other than the one in flight are stale: they come from
//! a cancelled or superseded attempt and must not touch the status.  The same
//! check guards the automatic reset: a reset only fires if the status it was
//! scheduled for is still showing.
//!
//! The orchestrator is plain data plus an SDK handle.  It never spawns tasks
//! or sleeps; when a terminal status is reached it returns
//! [`Effect::ScheduleReset`] and the caller owns the timer.

use std::sync::Arc;
use std::time::Duration;

use mpos_core::{
    AmountError, DeviceError, Generation, TransactionKind, TransactionRequest, TransactionStatus,
    UserSessionData,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::activity_log::ActivityLog;
use crate::application::payment_sdk::{
    EventSender, PaymentSdk, ReaderStatus, ReaderUpdate, SdkConfig,
};

/// How long `Success` / `Failed` stay visible before the status returns to
/// `Idle`.
pub const AUTO_RESET_DELAY: Duration = Duration::from_secs(2);

/// Errors raised by transaction operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("transaction {0} is still in flight")]
    AlreadyInFlight(Generation),

    #[error("no transaction in progress to cancel")]
    NothingToCancel,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("discarded update for superseded transaction {0}")]
    StaleCallback(Generation),
}

impl TransactionError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            TransactionError::InvalidAmount(_) => "Enter a transaction amount".to_string(),
            TransactionError::AlreadyInFlight(_) => {
                "A transaction is already in progress".to_string()
            }
            TransactionError::NothingToCancel => "No transaction in progress".to_string(),
            TransactionError::Device(e) => e.reason.clone(),
            TransactionError::StaleCallback(_) => String::new(),
        }
    }
}

/// Follow-up work the caller must perform after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Deliver `on_reset_elapsed(generation)` after `after`.
    ScheduleReset { generation: Generation, after: Duration },
}

pub struct TransactionOrchestrator {
    sdk: Arc<dyn PaymentSdk>,
    events: EventSender,
    status: TransactionStatus,
    /// Last generation handed out; never reused.
    issued: Generation,
    in_flight: Option<Generation>,
    /// Generation whose update produced the current status.
    status_generation: Generation,
    last_transfer_id: Option<String>,
}

impl TransactionOrchestrator {
    pub fn new(sdk: Arc<dyn PaymentSdk>, events: EventSender) -> Self {
        Self {
            sdk,
            events,
            status: TransactionStatus::Idle,
            issued: Generation::default(),
            in_flight: None,
            status_generation: Generation::default(),
            last_transfer_id: None,
        }
    }

    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    pub fn in_flight(&self) -> Option<Generation> {
        self.in_flight
    }

    /// Transfer id of the most recent approved transaction.
    pub fn last_transfer_id(&self) -> Option<&str> {
        self.last_transfer_id.as_deref()
    }

    /// Validates the amount, builds the request from `session` and submits it.
    ///
    /// The visible status is left untouched; it moves when the reader reports.
    /// A start is accepted while a previous `Success` / `Failed` is still
    /// showing.  That attempt's pending reset still returns the status to
    /// `Idle`, but stops applying once the new attempt has reported.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::AlreadyInFlight`] while another attempt has not
    ///   reached a terminal status or been cancelled.
    /// - [`TransactionError::InvalidAmount`] when `amount_text` is not a
    ///   non-negative decimal.
    /// - [`TransactionError::Device`] when the SDK refuses the request.
    pub fn start_transaction(
        &mut self,
        kind: TransactionKind,
        amount_text: &str,
        session: &UserSessionData,
        log: &mut ActivityLog,
    ) -> Result<Generation, TransactionError> {
        if let Some(generation) = self.in_flight {
            warn!(%generation, "start rejected: transaction still in flight");
            return Err(TransactionError::AlreadyInFlight(generation));
        }

        let request = match TransactionRequest::build(kind, amount_text, session) {
            Ok(request) => request,
            Err(e) => {
                log.append("Enter a transaction amount");
                return Err(e.into());
            }
        };

        let generation = self.issued.next();
        self.issued = generation;

        info!(
            %generation,
            %kind,
            amount = %request.amount,
            legs = request.split_transfers.as_ref().map_or(0, Vec::len),
            "starting transaction"
        );
        log.append(format!("Starting {kind} for {}", request.amount));

        let submitted = self
            .sdk
            .update(&SdkConfig::from(&session.all_configs))
            .and_then(|()| {
                self.sdk
                    .start_transaction(request, self.events.reporter(generation))
            });
        if let Err(e) = submitted {
            warn!(%generation, error = %e, "SDK refused transaction");
            log.append(format!("Transaction could not start: {}", e.reason));
            return Err(e.into());
        }

        self.in_flight = Some(generation);
        Ok(generation)
    }

    /// Cancels the in-flight transaction.
    ///
    /// Only valid while the reader is reading or processing a card.  The stop
    /// request is fire-and-forget: the status returns to `Idle` immediately
    /// and any late result from the cancelled attempt is discarded.
    pub fn cancel(&mut self, log: &mut ActivityLog) -> Result<(), TransactionError> {
        if !self.status.is_in_progress() {
            return Err(TransactionError::NothingToCancel);
        }

        self.sdk.stop_current_operation();
        if let Some(generation) = self.in_flight.take() {
            info!(%generation, "transaction cancelled");
            self.status_generation = generation;
        }
        self.status = TransactionStatus::Idle;
        log.append("Transaction cancelled");
        Ok(())
    }

    /// Applies one reader update tagged with `generation`.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::StaleCallback`] when `generation` is not the
    /// attempt in flight; nothing is changed in that case.
    pub fn on_update(
        &mut self,
        generation: Generation,
        update: ReaderUpdate,
        log: &mut ActivityLog,
    ) -> Result<Effect, TransactionError> {
        if self.in_flight != Some(generation) {
            debug!(%generation, ?update, "stale transaction update");
            return Err(TransactionError::StaleCallback(generation));
        }

        let status = match update {
            ReaderUpdate::Prompt(text) => {
                log.append(text);
                return Ok(Effect::None);
            }
            ReaderUpdate::CardRemoved => {
                log.append("Card removed");
                return Ok(Effect::None);
            }
            ReaderUpdate::Status(status) => status,
        };

        match status {
            ReaderStatus::ReadingCard => {
                // Never move backwards once processing has started.
                if self.status == TransactionStatus::ProcessingCard {
                    debug!(%generation, "ignoring ReadingCard after ProcessingCard");
                } else {
                    self.set_status(generation, TransactionStatus::ReadingCard);
                    log.append("Reading card");
                }
                Ok(Effect::None)
            }
            ReaderStatus::ProcessingCard => {
                self.set_status(generation, TransactionStatus::ProcessingCard);
                log.append("Processing card");
                Ok(Effect::None)
            }
            ReaderStatus::Approved { transfer_id } => {
                info!(%generation, %transfer_id, "transaction approved");
                log.append(format!("Transaction approved: {transfer_id}"));
                self.last_transfer_id = Some(transfer_id.clone());
                Ok(self.finish(generation, TransactionStatus::Success(transfer_id)))
            }
            ReaderStatus::Failed { error } => {
                warn!(%generation, %error, "transaction failed");
                log.append(format!("Transaction failed: {error}"));
                Ok(self.finish(generation, TransactionStatus::Failed(error)))
            }
        }
    }

    /// Ends the attempt in flight as `Failed(reason)` after the reader was
    /// lost.  A lost reader never reports again, so without this the attempt
    /// would block every later start.
    ///
    /// Returns `None` when nothing is in flight.
    pub fn on_reader_lost(&mut self, reason: &str, log: &mut ActivityLog) -> Option<Effect> {
        let generation = self.in_flight?;
        warn!(%generation, %reason, "reader lost during transaction");
        log.append(format!("Transaction failed: {reason}"));
        Some(self.finish(generation, TransactionStatus::Failed(reason.to_string())))
    }

    /// Returns the status to `Idle` if it still shows the terminal result of
    /// `generation`.  Returns `true` when the reset was applied.
    pub fn on_reset_elapsed(&mut self, generation: Generation) -> bool {
        if self.status.is_terminal() && self.status_generation == generation {
            self.status = TransactionStatus::Idle;
            true
        } else {
            debug!(%generation, "reset superseded");
            false
        }
    }

    fn set_status(&mut self, generation: Generation, status: TransactionStatus) {
        self.status = status;
        self.status_generation = generation;
    }

    fn finish(&mut self, generation: Generation, status: TransactionStatus) -> Effect {
        self.in_flight = None;
        self.set_status(generation, status);
        Effect::ScheduleReset {
            generation,
            after: AUTO_RESET_DELAY,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
