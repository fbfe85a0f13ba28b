//! Settings use cases: build the session the user is about to save.
//!
//! Every function here takes the current session by reference and returns a
//! modified copy.  The caller persists the copy and only then swaps it in, so
//! a failed save leaves the in-memory session exactly as it was.

use mpos_core::{
    AllEnvironmentConfigurations, Environment, EnvironmentConfig, SplitTransferEntry,
    UserSessionData, ValidationError,
};
use uuid::Uuid;

/// Values from the configuration screen for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEdit {
    pub environment: Environment,
    pub username: String,
    pub password: String,
    pub merchant_id: String,
    pub merchant_mid: String,
    pub device_id: String,
    /// Blank input clears the stored value.
    pub buyer_identity_id: Option<String>,
}

impl EnvironmentEdit {
    /// Pre-fills the form from what is stored for `environment`.
    pub fn from_session(session: &UserSessionData, environment: Environment) -> Self {
        let config = session.all_configs.get(environment);
        Self {
            environment,
            buyer_identity_id: config.buyer_identity_id().map(str::to_string),
            username: config.username,
            password: config.password,
            merchant_id: config.merchant_id,
            merchant_mid: config.merchant_mid,
            device_id: config.device_id,
        }
    }
}

/// Values from the "others" screen: tags and split transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OthersEdit {
    pub enable_split_transfers: bool,
    pub split_transfer_entries: Vec<SplitTransferEntry>,
    pub tags_string: String,
}

impl OthersEdit {
    pub fn from_session(session: &UserSessionData) -> Self {
        Self {
            enable_split_transfers: session.enable_split_transfers,
            split_transfer_entries: session.split_transfer_entries.clone(),
            tags_string: session.tags_string.clone(),
        }
    }

    /// Appends an empty entry with a fresh identifier and returns it.
    pub fn add_entry(&mut self) -> Uuid {
        let entry = SplitTransferEntry::new();
        let id = entry.id;
        self.split_transfer_entries.push(entry);
        id
    }

    /// Removes the entry with `id`; the others keep their order.
    pub fn remove_entry(&mut self, id: Uuid) -> bool {
        let before = self.split_transfer_entries.len();
        self.split_transfer_entries.retain(|e| e.id != id);
        self.split_transfer_entries.len() != before
    }
}

/// Stores the edited environment and makes it the selected one.
///
/// Other environments are untouched.
pub fn apply_environment_edit(session: &UserSessionData, edit: EnvironmentEdit) -> UserSessionData {
    let config = EnvironmentConfig::new(
        edit.username,
        edit.password,
        edit.merchant_id,
        edit.merchant_mid,
        edit.device_id,
    )
    .with_buyer_identity_id(edit.buyer_identity_id);

    let mut updated = session.clone();
    updated.all_configs.set(edit.environment, config);
    updated.all_configs.select(edit.environment);
    updated
}

/// Applies the tags and split-transfer settings, validating them strictly.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every failing field; nothing is
/// applied in that case.
pub fn apply_others_edit(
    session: &UserSessionData,
    edit: OthersEdit,
) -> Result<UserSessionData, ValidationError> {
    let updated = UserSessionData {
        enable_split_transfers: edit.enable_split_transfers,
        split_transfer_entries: edit.split_transfer_entries,
        tags_string: edit.tags_string,
        ..session.clone()
    };
    updated.validate()?;
    Ok(updated)
}

/// Replaces every environment configuration with `defaults`.
///
/// Tags and split-transfer settings are kept.
pub fn restore_defaults(
    session: &UserSessionData,
    defaults: &AllEnvironmentConfigurations,
) -> UserSessionData {
    UserSessionData {
        all_configs: defaults.normalized(),
        ..session.clone()
    }
}
