//! The user session aggregate: the unit of persistence.
//!
//! [`UserSessionData`] is loaded once at startup and replaced wholesale on
//! every save.  Callers never write individual fields to storage; they build a
//! modified copy, persist it, and swap the in-memory snapshot on success.
//!
//! # Strict validation
//!
//! [`UserSessionData::validate`] is the gate in front of an explicit "save"
//! of the tags / split-transfer settings.  It walks every field in one pass
//! and reports *every* violation, not just the first one, so the user can fix
//! all of them at once.  Submission-time parsing is lenient instead (see
//! `codec::tags::parse_tags`).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::codec::tags::validate_tags_format;
use crate::domain::environment::AllEnvironmentConfigurations;

/// Minimum number of legs in an enabled split transfer.
pub const MIN_SPLIT_TRANSFER_ENTRIES: usize = 2;

/// One or more user-facing validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed: {}", reasons.join("; "))]
pub struct ValidationError {
    /// Every violation found, in field order.
    pub reasons: Vec<String>,
}

impl ValidationError {
    /// Multi-line message listing every failing field.
    pub fn user_message(&self) -> String {
        self.reasons.join("\n")
    }
}

/// One leg of a split transfer as entered by the user.
///
/// `amount` and `fee` are raw decimal strings; they are converted to minor
/// units only when a transaction is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTransferEntry {
    /// Stable for the whole editing session; never reused.
    pub id: Uuid,
    #[serde(rename = "merchantID", default)]
    pub merchant_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub fee: String,
    /// Tags in `key:value,key:value` form.
    #[serde(default)]
    pub tags: String,
}

impl SplitTransferEntry {
    /// Creates an empty entry with a fresh identifier.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id: String::new(),
            amount: String::new(),
            fee: String::new(),
            tags: String::new(),
        }
    }
}

impl Default for SplitTransferEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate root persisted by the ConfigStore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSessionData {
    pub all_configs: AllEnvironmentConfigurations,
    pub enable_split_transfers: bool,
    /// Display order is submission order.
    pub split_transfer_entries: Vec<SplitTransferEntry>,
    pub tags_string: String,
}

impl UserSessionData {
    /// Returns a copy with every environment configuration normalised.
    pub fn normalized(&self) -> Self {
        Self {
            all_configs: self.all_configs.normalized(),
            ..self.clone()
        }
    }

    /// Strictly validates the tags and split-transfer settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if !validate_tags_format(&self.tags_string) {
            reasons.push(
                "Tags must be formatted as 'key:value' pairs separated by commas \
                 (e.g., 'key1:value1,key2:value2')"
                    .to_string(),
            );
        }

        if self.enable_split_transfers {
            if self.split_transfer_entries.len() < MIN_SPLIT_TRANSFER_ENTRIES {
                reasons.push(format!(
                    "Split transfers require at least {MIN_SPLIT_TRANSFER_ENTRIES} transfer entries"
                ));
            }
            for (index, entry) in self.split_transfer_entries.iter().enumerate() {
                let n = index + 1;
                if entry.merchant_id.trim().is_empty() {
                    reasons.push(format!("Transfer {n}: Merchant ID is required"));
                }
                if entry.amount.trim().is_empty() {
                    reasons.push(format!("Transfer {n}: Amount is required"));
                }
                if !validate_tags_format(&entry.tags) {
                    reasons.push(format!(
                        "Transfer {n}: Tags must be formatted as 'key:value' pairs separated by commas"
                    ));
                }
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { reasons })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
