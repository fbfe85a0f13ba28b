//! Transaction kinds, the visible transaction status, and the request shape
//! handed to the payment SDK.
//!
//! # Lifecycle
//!
//! ```text
//!          ┌──────────────────── cancel ────────────────────┐
//!          ▼                                                │
//!        Idle ──► ReadingCard ──► ProcessingCard ──► Success(transfer_id)
//!          ▲                                    └──► Failed(error)
//!          └──────────── automatic reset after 2 s ─────────┘
//! ```
//!
//! Transitions are driven by the reader's status events; this module only
//! defines the values.  The state machine itself lives in the terminal's
//! application layer.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::codec::amount::{to_minor_units, AmountError, MinorUnits};
use crate::codec::tags::{parse_tags, Tags};
use crate::domain::session::{SplitTransferEntry, UserSessionData};

/// The payment operation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Sale,
    Auth,
    Refund,
}

/// Error returned when a transaction kind cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown transaction kind: {0:?} (expected sale, auth or refund)")]
pub struct UnknownTransactionKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownTransactionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(TransactionKind::Sale),
            "auth" => Ok(TransactionKind::Auth),
            "refund" => Ok(TransactionKind::Refund),
            _ => Err(UnknownTransactionKind(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Auth => "auth",
            TransactionKind::Refund => "refund",
        };
        f.write_str(s)
    }
}

/// Monotonically increasing identifier of a transaction attempt.
///
/// Asynchronous results carry the generation they were issued for so that a
/// late result for a superseded attempt can be recognised and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// Returns the generation that follows `self`.
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The visible transaction status.  Exactly one value is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Idle,
    ReadingCard,
    ProcessingCard,
    Success(String),
    Failed(String),
}

impl TransactionStatus {
    /// `true` for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success(_) | TransactionStatus::Failed(_))
    }

    /// `true` while the reader is working on a card (cancellable states).
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TransactionStatus::ReadingCard | TransactionStatus::ProcessingCard
        )
    }

    /// Short label used by the UI projection.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Idle => "idle",
            TransactionStatus::ReadingCard => "reading_card",
            TransactionStatus::ProcessingCard => "processing_card",
            TransactionStatus::Success(_) => "success",
            TransactionStatus::Failed(_) => "failed",
        }
    }
}

/// One split-transfer leg in the shape the payment SDK expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    pub merchant_id: String,
    pub amount: MinorUnits,
    pub fee: Option<MinorUnits>,
    pub tags: Option<Tags>,
}

impl TransferLeg {
    /// Converts a user-entered entry, or returns `None` when its amount does
    /// not parse.  A fee that does not parse is dropped.
    pub fn from_entry(entry: &SplitTransferEntry) -> Option<Self> {
        let amount = to_minor_units(&entry.amount).ok()?;
        Some(Self {
            merchant_id: entry.merchant_id.trim().to_string(),
            amount,
            fee: to_minor_units(&entry.fee).ok(),
            tags: non_empty_tags(&entry.tags),
        })
    }
}

/// Everything the SDK needs to start one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub kind: TransactionKind,
    pub amount: MinorUnits,
    pub split_transfers: Option<Vec<TransferLeg>>,
    pub tags: Option<Tags>,
    pub buyer_identity_id: Option<String>,
}

impl TransactionRequest {
    /// Builds a request from user input and the current session snapshot.
    ///
    /// The top-level amount is strict; everything else is best-effort:
    /// split-transfer entries with an unparseable amount are left out and
    /// malformed tag pairs are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::InvalidAmount`] when `amount_text` is not a
    /// non-negative decimal number.
    pub fn build(
        kind: TransactionKind,
        amount_text: &str,
        session: &UserSessionData,
    ) -> Result<Self, AmountError> {
        let amount = to_minor_units(amount_text)?;

        let split_transfers = if session.enable_split_transfers
            && !session.split_transfer_entries.is_empty()
        {
            Some(
                session
                    .split_transfer_entries
                    .iter()
                    .filter_map(TransferLeg::from_entry)
                    .collect(),
            )
        } else {
            None
        };

        let buyer_identity_id = session
            .all_configs
            .selected()
            .buyer_identity_id()
            .map(str::to_string);

        Ok(Self {
            kind,
            amount,
            split_transfers,
            tags: non_empty_tags(&session.tags_string),
            buyer_identity_id,
        })
    }
}

fn non_empty_tags(text: &str) -> Option<Tags> {
    parse_tags(text).filter(|tags| !tags.is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
