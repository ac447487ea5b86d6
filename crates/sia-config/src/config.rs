// crates/sia-config/src/config.rs
// ============================================================================
// Module: SIA Raw Configuration Model
// Description: Raw config, account, and access-profile data types.
// Purpose: Describe configuration inputs before they are resolved into options.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! These types mirror the on-disk `sia_config` document and the values the
//! environment builder derives from `ATHENZ_SIA_*` variables. They carry no
//! defaults beyond "unset"; defaulting and cross-reference validation happen
//! once, in the options resolver.
//! Security posture: config inputs are untrusted and parsing fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default certificate refresh threshold applied when none is configured.
pub const DEFAULT_THRESHOLD: f64 = 15.0;
/// Default refresh interval (minutes) when the config does not set one.
pub const DEFAULT_REFRESH_INTERVAL: u32 = 120;
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Raw agent configuration sourced from a file or the environment.
///
/// # Invariants
/// - `service` names the primary service; it may be repeated in `services`.
/// - `iam_role_arn` is only populated by the environment builder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Config document version label.
    pub version: Option<String>,
    /// Primary service name.
    pub service: String,
    /// Additional service declarations keyed by service name.
    pub services: BTreeMap<String, ConfigService>,
    /// Account blocks; exactly one is selected as the primary account.
    pub accounts: Vec<ConfigAccount>,
    /// Access token declarations keyed by delivery file name.
    #[serde(alias = "accesstokens")]
    pub access_tokens: BTreeMap<String, AccessTokenConfig>,
    /// Global certificate refresh threshold.
    #[serde(rename = "cert_threshold_to_check", alias = "threshold")]
    pub threshold: Option<f64>,
    /// Global SSH certificate refresh threshold.
    #[serde(rename = "sshcert_threshold_to_check", alias = "sshthreshold")]
    pub ssh_threshold: Option<f64>,
    /// SSH host key type selector.
    pub ssh_host_key_type: Option<SshHostKeyType>,
    /// Refresh interval in minutes.
    pub refresh_interval: Option<u32>,
    /// Use the regional STS endpoint.
    #[serde(rename = "regionalsts", alias = "regional_sts")]
    pub use_regional_sts: bool,
    /// ZTS region override.
    pub zts_region: Option<String>,
    /// Drop privileges after startup.
    pub drop_privileges: bool,
    /// Generate a dedicated key per role certificate.
    pub generate_role_key: bool,
    /// Rotate the service private key on refresh.
    pub rotate_key: bool,
    /// Request a wildcard SAN DNS entry.
    pub san_dns_wildcard: bool,
    /// Request a hostname SAN DNS entry.
    pub san_dns_hostname: bool,
    /// Config-level default file owner.
    pub user: Option<String>,
    /// Config-level default file group.
    pub group: Option<String>,
    /// Secure local delivery socket path.
    pub sds_uds_path: Option<String>,
    /// Uid allowed to connect to the local delivery socket.
    pub sds_uds_uid: Option<u32>,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
    /// IAM role ARN (environment path only).
    #[serde(skip)]
    pub iam_role_arn: Option<String>,
}

impl Config {
    /// Selects the primary account block for this host.
    ///
    /// A single block is selected when no account id is known. Several
    /// blocks require the host's account id to pick one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no block matches or the matching
    /// block has no domain.
    pub fn select_account(&self, account_id: Option<&str>) -> Result<ConfigAccount, ConfigError> {
        let selected = match (account_id, self.accounts.as_slice()) {
            (_, []) => {
                return Err(ConfigError::Invalid("config declares no account block".to_string()));
            }
            (None, [single]) => single,
            (None, _) => {
                return Err(ConfigError::Invalid(
                    "config declares several accounts but no account id is known".to_string(),
                ));
            }
            (Some(id), accounts) => {
                accounts.iter().find(|block| block.account == id).ok_or_else(|| {
                    ConfigError::Invalid(format!("missing account {id} details from config"))
                })?
            }
        };
        if selected.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("account block is missing domain".to_string()));
        }
        let mut account = selected.clone();
        account.set_service(&self.service);
        Ok(account)
    }
}

/// Additional service declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigService {
    /// Certificate file name override.
    pub filename: Option<String>,
    /// File owner user name.
    pub user: Option<String>,
    /// File owner group name.
    pub group: Option<String>,
    /// Explicit uid; skips the user lookup.
    pub uid: Option<u32>,
    /// Explicit gid; skips the group lookup.
    pub gid: Option<u32>,
    /// File mode for delivered credentials.
    #[serde(alias = "filemode")]
    pub file_mode: Option<u32>,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
    /// Uid allowed to fetch this service's credentials over the socket.
    pub sds_uds_uid: Option<u32>,
    /// Per-service refresh threshold.
    #[serde(rename = "cert_threshold_to_check", alias = "threshold")]
    pub threshold: Option<f64>,
}

/// Role certificate declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigRole {
    /// Certificate file name override.
    pub filename: Option<String>,
    /// File mode for the role certificate.
    #[serde(alias = "filemode")]
    pub file_mode: Option<u32>,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
    /// Owning service name.
    pub service: Option<String>,
    /// File owner user name.
    pub user: Option<String>,
    /// Per-role refresh threshold.
    #[serde(rename = "cert_threshold_to_check", alias = "threshold")]
    pub threshold: Option<f64>,
}

/// Access token declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessTokenConfig {
    /// Service the token is issued for.
    pub service: Option<String>,
    /// Explicit token domain.
    pub domain: Option<String>,
    /// Role references (`name`, `domain:role.name`, or `*`).
    pub roles: Vec<String>,
    /// Token expiry in seconds.
    #[serde(alias = "expiry")]
    pub expires_in: Option<u64>,
    /// Delivery file owner.
    pub user: Option<String>,
}

/// Resolved identity facts for the primary account.
///
/// # Invariants
/// - `name` is `domain.service` once [`ConfigAccount::set_service`] ran.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigAccount {
    /// Cloud account id.
    pub account: String,
    /// Identity domain.
    pub domain: String,
    /// Primary service name.
    pub service: String,
    /// Full service name (`domain.service`).
    pub name: String,
    /// Account-level default file owner.
    pub user: Option<String>,
    /// Account-level default file group.
    pub group: Option<String>,
    /// Role certificates associated with the account.
    pub roles: BTreeMap<String, ConfigRole>,
}

impl ConfigAccount {
    /// Builds an account from parsed identity facts.
    #[must_use]
    pub fn new(account: &str, domain: &str, service: &str) -> Self {
        let mut value = Self {
            account: account.to_string(),
            domain: domain.to_string(),
            ..Self::default()
        };
        value.set_service(service);
        value
    }

    /// Sets the primary service and recomputes the full name.
    pub fn set_service(&mut self, service: &str) {
        self.service = service.to_string();
        self.name = format!("{}.{}", self.domain, self.service);
    }
}

/// Access-profile configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccessProfileConfig {
    /// Access profile name.
    pub profile: String,
    /// Optional restriction label for the profile.
    pub profile_restrict_to: Option<String>,
    /// Role threshold overrides keyed by role name.
    pub roles: BTreeMap<String, ProfileRoleConfig>,
}

/// Access-profile role override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileRoleConfig {
    /// Refresh threshold override for the role.
    #[serde(rename = "cert_threshold_to_check", alias = "threshold")]
    pub threshold: Option<f64>,
}

// ============================================================================
// SECTION: SSH Host Key Type
// ============================================================================

/// SSH host key algorithm selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SshHostKeyType {
    /// RSA host key.
    #[default]
    Rsa,
    /// ECDSA host key.
    Ecdsa,
    /// Ed25519 host key.
    Ed25519,
}

impl SshHostKeyType {
    /// Returns the stable config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ecdsa => "ecdsa",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SshHostKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SshHostKeyType {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rsa" => Ok(Self::Rsa),
            "ecdsa" => Ok(Self::Ecdsa),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(ConfigError::Parse(format!("unknown ssh host key type: {other}"))),
        }
    }
}

impl<'de> Deserialize<'de> for SshHostKeyType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for SshHostKeyType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// JSON or value parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a config file with size and encoding limits.
pub(crate) fn read_bounded_file(path: &Path) -> Result<String, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let content = String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
    if content.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{} is empty", path.display())));
    }
    Ok(content)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
