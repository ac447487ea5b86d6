// crates/sia-options/src/options.rs
// ============================================================================
// Module: Resolved Options Model
// Description: Immutable options handed to issuance and refresh consumers.
// Purpose: Define the resolved service, role, and token records.
// Dependencies: serde, sia-config, thiserror
// ============================================================================

//! ## Overview
//! [`Options`] is the single output of resolution. It is built once at
//! startup and never mutated afterwards. `services[0]` is always the primary
//! service; the remaining services carry no ordering guarantee.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Serialize;
use sia_config::ConfigError;
use sia_config::SshHostKeyType;
use thiserror::Error;

use crate::metadata::MetadataError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default access token expiry in seconds.
pub const DEFAULT_TOKEN_EXPIRY: u64 = 28_800;
/// Default file mode for delivered credentials (`0440`).
pub const DEFAULT_FILE_MODE: u32 = 0o440;
/// Token directory name under the agent directory.
pub const TOKEN_DIR_NAME: &str = "tokens";
/// Key directory name under the agent directory.
pub const KEY_DIR_NAME: &str = "keys";
/// Certificate directory name under the agent directory.
pub const CERT_DIR_NAME: &str = "certs";
/// Role reference matching every role in a domain.
pub const WILDCARD_ROLE: &str = "*";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolved service identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    /// Service name, unique within [`Options::services`].
    pub name: String,
    /// Certificate file name override.
    pub filename: Option<String>,
    /// File owner user name.
    pub user: Option<String>,
    /// File owner uid.
    pub uid: u32,
    /// File owner group name.
    pub group: Option<String>,
    /// File owner gid.
    pub gid: u32,
    /// File mode for delivered credentials.
    pub file_mode: u32,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
    /// Uid allowed to fetch credentials over the local socket.
    pub sds_uds_uid: Option<u32>,
    /// Effective refresh threshold.
    pub threshold: f64,
}

/// Resolved role certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    /// Domain-qualified role name (`domain:role.name`).
    pub name: String,
    /// Owning service name.
    pub service: String,
    /// Certificate file name override.
    pub filename: Option<String>,
    /// File owner user name.
    pub user: Option<String>,
    /// File owner uid.
    pub uid: u32,
    /// File owner gid.
    pub gid: u32,
    /// File mode for the role certificate.
    pub file_mode: u32,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
    /// Effective refresh threshold.
    pub threshold: f64,
}

/// Resolved access token delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    /// Delivery file name under the token directory.
    pub file_name: String,
    /// Service the token is issued for.
    pub service: String,
    /// Token domain.
    pub domain: String,
    /// Role names within the domain; `*` requests every role.
    pub roles: Vec<String>,
    /// Token expiry in seconds.
    pub expiry: u64,
    /// Delivery file owner.
    pub user: Option<String>,
    /// Delivery file owner uid.
    pub uid: u32,
    /// Delivery file owner gid.
    pub gid: u32,
}

/// Resolved agent options.
///
/// # Invariants
/// - `services` is non-empty and `services[0]` is the primary service.
/// - Every access token references a service in `services`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    /// Agent version string.
    pub version: String,
    /// Agent working directory.
    pub sia_dir: PathBuf,
    /// Cloud account id.
    pub account: String,
    /// Identity domain.
    pub domain: String,
    /// Full primary name (`domain.service`).
    pub name: String,
    /// Access profile name.
    pub profile: Option<String>,
    /// Access profile restriction label.
    pub profile_restrict_to: Option<String>,
    /// Services; index 0 is the primary, the rest are unordered.
    pub services: Vec<Service>,
    /// Role certificates.
    pub roles: Vec<Role>,
    /// Access token deliveries.
    pub access_tokens: Vec<AccessToken>,
    /// Primary service refresh threshold.
    pub threshold: f64,
    /// SSH certificate refresh threshold.
    pub ssh_threshold: f64,
    /// SSH host key algorithm; `None` when not configured.
    pub ssh_host_key_type: Option<SshHostKeyType>,
    /// Access token directory (`<sia_dir>/tokens`).
    pub token_dir: PathBuf,
    /// Private key directory (`<sia_dir>/keys`).
    pub key_dir: PathBuf,
    /// Certificate directory (`<sia_dir>/certs`).
    pub cert_dir: PathBuf,
    /// Refresh interval in minutes.
    pub refresh_interval: u32,
    /// ZTS region override.
    pub zts_region: Option<String>,
    /// Use the regional STS endpoint.
    pub use_regional_sts: bool,
    /// Drop privileges after startup.
    pub drop_privileges: bool,
    /// Generate a key per role certificate.
    pub generate_role_key: bool,
    /// Rotate the service key on refresh.
    pub rotate_key: bool,
    /// Request a wildcard SAN DNS entry.
    pub san_dns_wildcard: bool,
    /// Request a hostname SAN DNS entry.
    pub san_dns_hostname: bool,
    /// Local delivery socket path.
    pub sds_uds_path: Option<PathBuf>,
    /// Local delivery socket uid.
    pub sds_uds_uid: Option<u32>,
    /// Certificate expiry time in minutes.
    pub expiry_time: Option<u32>,
}

impl Options {
    /// Returns the service with the given name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Returns the access token delivered to the given file name.
    #[must_use]
    pub fn access_token(&self, file_name: &str) -> Option<&AccessToken> {
        self.access_tokens.iter().find(|token| token.file_name == file_name)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Options resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Config input failed to parse.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Instance metadata was unreachable or malformed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// Cross-reference or value validation failed.
    #[error("invalid options: {0}")]
    Invalid(String),
    /// OS user or group lookup failed.
    #[error("identity lookup error: {0}")]
    Lookup(String),
    /// Every configuration source failed.
    #[error("unable to resolve configuration: {0}")]
    Unresolvable(String),
}
