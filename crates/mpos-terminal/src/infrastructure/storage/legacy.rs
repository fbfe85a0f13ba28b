//! Upgrade path for session documents written by older terminal versions.
//!
//! Older versions stored a single implicit environment as flat keys:
//!
//! ```json
//! { "environment": "QA", "username": "…", "password": "…",
//!   "merchantId": "…", "mid": "…", "deviceId": "…" }
//! ```
//!
//! There were no tags and no split transfers.  The five credential fields are
//! moved into the environment named by `environment`, which also becomes the
//! selected one.  A missing or unrecognised token falls back to the default
//! environment.

use mpos_core::{AllEnvironmentConfigurations, Environment, EnvironmentConfig, UserSessionData};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Keys whose presence marks a document as legacy.
const LEGACY_KEYS: [&str; 6] = [
    "environment",
    "username",
    "password",
    "merchantId",
    "mid",
    "deviceId",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct LegacyDocument {
    environment: Option<String>,
    username: String,
    password: String,
    merchant_id: String,
    mid: String,
    device_id: String,
}

impl LegacyDocument {
    /// `true` when `object` has the legacy shape rather than the current one.
    pub(crate) fn detect(object: &Map<String, Value>) -> bool {
        !object.contains_key("allConfigs") && LEGACY_KEYS.iter().any(|k| object.contains_key(*k))
    }

    pub(crate) fn migrate(self) -> UserSessionData {
        let environment = match self.environment.as_deref() {
            Some(token) => token.parse::<Environment>().unwrap_or_else(|e| {
                warn!("{e} in legacy session; using {}", Environment::default());
                Environment::default()
            }),
            None => Environment::default(),
        };

        let mut all_configs = AllEnvironmentConfigurations::default();
        all_configs.set(
            environment,
            EnvironmentConfig::new(
                self.username,
                self.password,
                self.merchant_id,
                self.mid,
                self.device_id,
            ),
        );
        all_configs.select(environment);

        UserSessionData {
            all_configs,
            ..Default::default()
        }
    }
}
