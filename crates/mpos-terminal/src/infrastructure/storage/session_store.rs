//! ConfigStore: persistence of the user session document.
//!
//! The session is stored as one JSON document and always replaced whole:
//!
//! ```json
//! {
//!   "allConfigs": {
//!     "configs": { "Sandbox": { "username": "…", "merchantId": "…", … } },
//!     "selectedEnvironment": "Sandbox"
//!   },
//!   "enableSplitTransfers": false,
//!   "splitTransferEntries": [],
//!   "tagsString": ""
//! }
//! ```
//!
//! # Failure policy
//!
//! - **Load** never fails.  A missing, unreadable or corrupt document yields
//!   a fresh session seeded with the factory environment configuration, so a
//!   bad file can never block startup.  Documents in the legacy flat format
//!   are upgraded on the fly.
//! - **Save** reports failure to the caller.  The caller keeps its previous
//!   in-memory session until a save succeeds.
//!
//! Saves are serialised behind an async mutex: a second save waits for the
//! first to finish instead of interleaving writes.

use std::sync::Arc;

use mpos_core::{AllEnvironmentConfigurations, UserSessionData};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::legacy::LegacyDocument;
use super::medium::StorageMedium;

/// Errors raised when persisting the session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to encode session: {0}")]
    EncodeFailed(#[source] serde_json::Error),

    #[error("failed to write session: {0}")]
    WriteFailed(#[source] std::io::Error),
}

impl StorageError {
    /// Retryable message shown to the user.
    pub fn user_message(&self) -> &'static str {
        "Could not save your settings, please try again."
    }
}

/// Why a stored document was discarded on load.
#[derive(Debug, Error)]
enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("document matches neither the current nor the legacy layout")]
    UnrecognizedLayout,
}

pub struct ConfigStore {
    medium: Arc<dyn StorageMedium>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self {
            medium,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the stored session.  When nothing usable is stored, returns a
    /// fresh session whose environments come from `defaults`.
    pub async fn load(&self, defaults: &AllEnvironmentConfigurations) -> UserSessionData {
        self.load_stored().await.unwrap_or_else(|| UserSessionData {
            all_configs: defaults.normalized(),
            ..Default::default()
        })
    }

    async fn load_stored(&self) -> Option<UserSessionData> {
        let bytes = match self.medium.read().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no stored session; starting fresh");
                return None;
            }
            Err(e) => {
                warn!("could not read stored session: {e}; starting fresh");
                return None;
            }
        };

        match decode(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("discarding stored session: {e}");
                None
            }
        }
    }

    /// Persists a normalised copy of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EncodeFailed`] if the session cannot be
    /// serialised and [`StorageError::WriteFailed`] if the medium rejects the
    /// write.
    pub async fn save(&self, data: &UserSessionData) -> Result<(), StorageError> {
        let normalized = data.normalized();
        let bytes = serde_json::to_vec_pretty(&normalized).map_err(StorageError::EncodeFailed)?;

        let _guard = self.write_lock.lock().await;
        self.medium
            .write(&bytes)
            .await
            .map_err(StorageError::WriteFailed)?;
        debug!("session saved ({} bytes)", bytes.len());
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<UserSessionData, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(object) = &value else {
        return Err(DecodeError::NotAnObject);
    };

    if object.contains_key("allConfigs") {
        return Ok(serde_json::from_value(value)?);
    }
    if LegacyDocument::detect(object) {
        let legacy: LegacyDocument = serde_json::from_value(value)?;
        info!("upgrading legacy session document");
        return Ok(legacy.migrate());
    }
    Err(DecodeError::UnrecognizedLayout)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::medium::InMemoryMedium;
    use mpos_core::{Environment, EnvironmentConfig, SplitTransferEntry};

    fn store_with(medium: Arc<InMemoryMedium>) -> ConfigStore {
        ConfigStore::new(medium)
    }

    /// Loads with no factory configuration.
    async fn load_plain(store: &ConfigStore) -> UserSessionData {
        store.load(&AllEnvironmentConfigurations::default()).await
    }

    fn sample_session() -> UserSessionData {
        let mut session = UserSessionData {
            tags_string: "order:42".into(),
            enable_split_transfers: true,
            ..Default::default()
        };
        session.all_configs.set(
            Environment::Production,
            EnvironmentConfig::new("prod", "", "", "", "").with_buyer_identity_id(Some("IDbuyer")),
        );
        session.all_configs.select(Environment::Production);
        session.split_transfer_entries.push(SplitTransferEntry::new());
        session.split_transfer_entries.push(SplitTransferEntry::new());
        session
    }

    #[tokio::test]
    async fn test_load_without_document_returns_default() {
        let store = store_with(Arc::new(InMemoryMedium::new()));
        assert_eq!(load_plain(&store).await, UserSessionData::default());
    }

    #[tokio::test]
    async fn test_first_run_is_seeded_from_defaults() {
        // Arrange
        let store = store_with(Arc::new(InMemoryMedium::new()));
        let mut defaults = AllEnvironmentConfigurations::default();
        defaults.set(
            Environment::Qa,
            EnvironmentConfig::new("factory", "pw", "MU", "MID", "DV").with_buyer_identity_id(Some(" ")),
        );
        defaults.select(Environment::Qa);

        // Act
        let loaded = store.load(&defaults).await;

        // Assert
        assert_eq!(loaded.all_configs.selected_environment, Environment::Qa);
        assert_eq!(loaded.all_configs.get(Environment::Qa).username, "factory");
        assert_eq!(loaded.all_configs.get(Environment::Qa).buyer_identity_id(), None);
        assert!(loaded.tags_string.is_empty());
        assert!(loaded.split_transfer_entries.is_empty());
    }

    #[tokio::test]
    async fn test_stored_document_wins_over_defaults() {
        let medium = Arc::new(InMemoryMedium::new());
        let store = store_with(Arc::clone(&medium));
        let session = sample_session();
        store.save(&session).await.unwrap();
        let mut defaults = AllEnvironmentConfigurations::default();
        defaults.set(Environment::Production, EnvironmentConfig::new("factory", "", "", "", ""));

        let loaded = store.load(&defaults).await;

        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        // Arrange
        let medium = Arc::new(InMemoryMedium::new());
        let store = store_with(Arc::clone(&medium));
        let session = sample_session();

        // Act
        store.save(&session).await.unwrap();
        let loaded = load_plain(&store).await;

        // Assert
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_absent_buyer_identity_is_omitted_from_document() {
        // Arrange
        let medium = Arc::new(InMemoryMedium::new());
        let store = store_with(Arc::clone(&medium));
        let mut session = UserSessionData::default();
        session.all_configs.get_mut(Environment::Sandbox).username = "sb".into();

        // Act
        store.save(&session).await.unwrap();

        // Assert
        let text = String::from_utf8(medium.contents().unwrap()).unwrap();
        assert!(!text.contains("buyerIdentityId"), "got {text}");
        assert!(text.contains("\"selectedEnvironment\""));
        assert!(text.contains("\"tagsString\""));
    }

    #[tokio::test]
    async fn test_empty_buyer_identity_in_document_reads_as_absent() {
        let medium = Arc::new(InMemoryMedium::with_bytes(
            r#"{"allConfigs":{"configs":{"QA":{"username":"q","buyerIdentityId":""}},"selectedEnvironment":"QA"}}"#,
        ));
        let store = store_with(medium);

        let loaded = load_plain(&store).await;

        assert_eq!(loaded.all_configs.selected_environment, Environment::Qa);
        assert_eq!(loaded.all_configs.get(Environment::Qa).buyer_identity_id(), None);
    }

    #[tokio::test]
    async fn test_corrupt_document_recovers_silently() {
        for bytes in ["{not json", "[1,2,3]", r#"{"unrelated":true}"#] {
            let store = store_with(Arc::new(InMemoryMedium::with_bytes(bytes)));
            assert_eq!(load_plain(&store).await, UserSessionData::default(), "input {bytes}");
        }
    }

    #[tokio::test]
    async fn test_legacy_document_is_upgraded() {
        // Arrange
        let medium = Arc::new(InMemoryMedium::with_bytes(
            r#"{"environment":"Production","username":"u","password":"p","merchantId":"m","mid":"mid","deviceId":"d"}"#,
        ));
        let store = store_with(medium);

        // Act
        let loaded = load_plain(&store).await;

        // Assert
        let prod = loaded.all_configs.get(Environment::Production);
        assert_eq!(loaded.all_configs.selected_environment, Environment::Production);
        assert_eq!(
            (prod.username.as_str(), prod.password.as_str(), prod.merchant_id.as_str()),
            ("u", "p", "m")
        );
        assert_eq!(prod.merchant_mid, "mid");
        assert_eq!(prod.device_id, "d");
        assert_eq!(loaded.all_configs.get(Environment::Sandbox), EnvironmentConfig::default());
    }

    #[tokio::test]
    async fn test_failed_write_is_reported_and_keeps_previous_document() {
        // Arrange
        let medium = Arc::new(InMemoryMedium::new());
        let store = store_with(Arc::clone(&medium));
        store.save(&UserSessionData::default()).await.unwrap();
        medium.set_fail_writes(true);

        // Act
        let err = store.save(&sample_session()).await.unwrap_err();

        // Assert
        assert!(matches!(err, StorageError::WriteFailed(_)));
        assert!(err.user_message().contains("please try again"));
        assert_eq!(load_plain(&store).await, UserSessionData::default());
    }

    #[tokio::test]
    async fn test_concurrent_saves_do_not_interleave() {
        // Arrange
        let medium = Arc::new(InMemoryMedium::new());
        let store = Arc::new(store_with(Arc::clone(&medium)));
        let a = UserSessionData {
            tags_string: "a:1".into(),
            ..Default::default()
        };
        let b = UserSessionData {
            tags_string: "b:2".into(),
            ..Default::default()
        };

        // Act
        let (ra, rb) = tokio::join!(store.save(&a), store.save(&b));

        // Assert: whichever finished last, the document is one complete session.
        ra.unwrap();
        rb.unwrap();
        let loaded = load_plain(&store).await;
        assert!(loaded == a || loaded == b);
    }
}
