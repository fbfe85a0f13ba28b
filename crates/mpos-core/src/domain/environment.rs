//! Deployment environments and their per-environment configuration.
//!
//! Every environment (production, sandbox, QA) carries its own API
//! credentials, merchant identifiers and card-reader identifier.  Exactly one
//! environment is *selected* at any time; switching the selection never
//! touches the configuration stored for the other environments.
//!
//! # The `buyerIdentityId` invariant
//!
//! `buyer_identity_id` is optional.  A blank or whitespace-only value means
//! "absent" and is normalised to `None` at every mutation site:
//!
//! - [`EnvironmentConfig::set_buyer_identity_id`] (assignment),
//! - deserialisation (a persisted `""` is read back as `None`),
//! - [`EnvironmentConfig::normalized`] (used at the persistence boundary).
//!
//! The field is private so no code path can observe a present-but-empty value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Error returned when an environment token cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown environment token: {0:?}")]
pub struct UnknownEnvironment(pub String);

/// A named deployment target with its own credentials.
///
/// The serialised form is the stable token returned by [`Environment::token`];
/// it is used both as a map key and as the `selectedEnvironment` value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
    #[serde(rename = "QA")]
    Qa,
}

impl Environment {
    /// All environments in display order.
    pub const ALL: [Environment; 3] = [Environment::Production, Environment::Sandbox, Environment::Qa];

    /// Returns the stable string token for this environment.
    pub fn token(self) -> &'static str {
        match self {
            Environment::Production => "Production",
            Environment::Sandbox => "Sandbox",
            Environment::Qa => "QA",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    /// Parses a token case-insensitively (`"qa"`, `"QA"` and `"Qa"` all match).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Environment::ALL
            .into_iter()
            .find(|env| env.token().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownEnvironment(s.to_string()))
    }
}

/// Credentials and identifiers for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub username: String,
    pub password: String,
    pub merchant_id: String,
    pub merchant_mid: String,
    pub device_id: String,
    /// Omitted from the document entirely when absent.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_buyer_identity_id"
    )]
    buyer_identity_id: Option<String>,
}

impl EnvironmentConfig {
    /// A configuration without a buyer identity.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        merchant_id: impl Into<String>,
        merchant_mid: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            merchant_id: merchant_id.into(),
            merchant_mid: merchant_mid.into(),
            device_id: device_id.into(),
            buyer_identity_id: None,
        }
    }

    /// Returns the buyer identity, never `Some("")`.
    pub fn buyer_identity_id(&self) -> Option<&str> {
        self.buyer_identity_id.as_deref()
    }

    /// Assigns the buyer identity, normalising blank input to `None`.
    pub fn set_buyer_identity_id<S: Into<String>>(&mut self, value: Option<S>) {
        self.buyer_identity_id = normalize_buyer_identity_id(value.map(Into::into));
    }

    /// Builder-style variant of [`set_buyer_identity_id`](Self::set_buyer_identity_id).
    pub fn with_buyer_identity_id<S: Into<String>>(mut self, value: Option<S>) -> Self {
        self.set_buyer_identity_id(value);
        self
    }

    /// Returns a copy with every invariant re-applied.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.buyer_identity_id = normalize_buyer_identity_id(copy.buyer_identity_id.take());
        copy
    }
}

/// Blank or whitespace-only → `None`.  Non-blank values are kept verbatim.
pub fn normalize_buyer_identity_id(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn deserialize_buyer_identity_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_buyer_identity_id(raw))
}

/// The configuration of every environment plus the current selection.
///
/// `configs` is sparse: an environment with no entry reads back as
/// `EnvironmentConfig::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllEnvironmentConfigurations {
    pub configs: BTreeMap<Environment, EnvironmentConfig>,
    pub selected_environment: Environment,
}

impl AllEnvironmentConfigurations {
    /// Returns the configuration for `env`, default-constructed when missing.
    pub fn get(&self, env: Environment) -> EnvironmentConfig {
        self.configs.get(&env).cloned().unwrap_or_default()
    }

    /// Returns a mutable entry for `env`, inserting a default one when missing.
    pub fn get_mut(&mut self, env: Environment) -> &mut EnvironmentConfig {
        self.configs.entry(env).or_default()
    }

    /// Replaces the configuration stored for `env`.
    pub fn set(&mut self, env: Environment, config: EnvironmentConfig) {
        self.configs.insert(env, config.normalized());
    }

    /// Configuration of the currently selected environment.
    pub fn selected(&self) -> EnvironmentConfig {
        self.get(self.selected_environment)
    }

    /// Switches the selected environment without touching any stored entry.
    pub fn select(&mut self, env: Environment) {
        self.selected_environment = env;
    }

    /// Returns a copy with every environment entry normalised.
    pub fn normalized(&self) -> Self {
        Self {
            configs: self
                .configs
                .iter()
                .map(|(env, cfg)| (*env, cfg.normalized()))
                .collect(),
            selected_environment: self.selected_environment,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
