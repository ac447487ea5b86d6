// crates/sia-config/src/env.rs
// ============================================================================
// Module: Environment Config Builder
// Description: Builds a Config from ATHENZ_SIA_* environment variables.
// Purpose: Provide a file-less configuration path for containerized hosts.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The environment is read exactly once into an [`EnvSnapshot`]; every
//! decision after that works on the snapshot, never on live process state.
//! Recognized variables are strictly typed: booleans accept only
//! `true`/`false` (any case) and integers must be base-10. One malformed value
//! fails the whole build.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;

use crate::arn::ROLE_RESOURCE_PREFIX;
use crate::arn::parse_role_arn;
use crate::config::Config;
use crate::config::ConfigAccount;
use crate::config::ConfigError;
use crate::config::ConfigRole;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix shared by every recognized variable.
pub const ENV_PREFIX: &str = "ATHENZ_SIA_";
/// Request a wildcard SAN DNS entry.
pub const ENV_SANDNS_WILDCARD: &str = "ATHENZ_SIA_SANDNS_WILDCARD";
/// Request a hostname SAN DNS entry.
pub const ENV_SANDNS_HOSTNAME: &str = "ATHENZ_SIA_SANDNS_HOSTNAME";
/// Use the regional STS endpoint.
pub const ENV_REGIONAL_STS: &str = "ATHENZ_SIA_REGIONAL_STS";
/// Generate a key per role certificate.
pub const ENV_GENERATE_ROLE_KEY: &str = "ATHENZ_SIA_GENERATE_ROLE_KEY";
/// Rotate the service key on refresh.
pub const ENV_ROTATE_KEY: &str = "ATHENZ_SIA_ROTATE_KEY";
/// Default file owner.
pub const ENV_USER: &str = "ATHENZ_SIA_USER";
/// Default file group.
pub const ENV_GROUP: &str = "ATHENZ_SIA_GROUP";
/// Local delivery socket path.
pub const ENV_SDS_UDS_PATH: &str = "ATHENZ_SIA_SDS_UDS_PATH";
/// Local delivery socket uid.
pub const ENV_SDS_UDS_UID: &str = "ATHENZ_SIA_SDS_UDS_UID";
/// Certificate expiry time in minutes.
pub const ENV_EXPIRY_TIME: &str = "ATHENZ_SIA_EXPIRY_TIME";
/// Refresh interval in minutes.
pub const ENV_REFRESH_INTERVAL: &str = "ATHENZ_SIA_REFRESH_INTERVAL";
/// ZTS region override.
pub const ENV_ZTS_REGION: &str = "ATHENZ_SIA_ZTS_REGION";
/// Drop privileges after startup.
pub const ENV_DROP_PRIVILEGES: &str = "ATHENZ_SIA_DROP_PRIVILEGES";
/// IAM role ARN naming the `<domain>.<service>` identity.
pub const ENV_IAM_ROLE_ARN: &str = "ATHENZ_SIA_IAM_ROLE_ARN";
/// JSON map of role name to role declaration.
pub const ENV_ACCOUNT_ROLES: &str = "ATHENZ_SIA_ACCOUNT_ROLES";
/// Maximum bytes accepted for a single variable value.
const MAX_ENV_VALUE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// One-shot copy of the `ATHENZ_SIA_*` environment.
///
/// # Invariants
/// - Only keys starting with [`ENV_PREFIX`] are retained.
/// - Empty values are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// Captured variables keyed by full name.
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_pairs(env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Builds a snapshot from explicit pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        Self {
            vars,
        }
    }

    /// Returns the trimmed value for a key, or `None` when unset or empty.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds a config and primary account from an environment snapshot.
///
/// Recognized variables override the matching fields of `base`; unset
/// variables leave them untouched.
///
/// # Errors
///
/// Returns [`ConfigError`] when the role ARN is missing or malformed, or any
/// recognized variable fails to parse.
pub fn build_env_config(
    snapshot: &EnvSnapshot,
    base: Option<Config>,
) -> Result<(Config, ConfigAccount), ConfigError> {
    let mut config = base.unwrap_or_default();

    let role_arn = snapshot
        .get(ENV_IAM_ROLE_ARN)
        .ok_or_else(|| ConfigError::Invalid(format!("{ENV_IAM_ROLE_ARN} must be set")))?;
    let parsed = parse_role_arn(role_arn, ROLE_RESOURCE_PREFIX, "", None)?;
    config.service.clone_from(&parsed.service);
    config.iam_role_arn = Some(role_arn.to_string());

    apply_bool(snapshot, ENV_SANDNS_WILDCARD, &mut config.san_dns_wildcard)?;
    apply_bool(snapshot, ENV_SANDNS_HOSTNAME, &mut config.san_dns_hostname)?;
    apply_bool(snapshot, ENV_REGIONAL_STS, &mut config.use_regional_sts)?;
    apply_bool(snapshot, ENV_GENERATE_ROLE_KEY, &mut config.generate_role_key)?;
    apply_bool(snapshot, ENV_ROTATE_KEY, &mut config.rotate_key)?;
    apply_bool(snapshot, ENV_DROP_PRIVILEGES, &mut config.drop_privileges)?;

    apply_u32(snapshot, ENV_SDS_UDS_UID, &mut config.sds_uds_uid)?;
    apply_u32(snapshot, ENV_EXPIRY_TIME, &mut config.expiry_time)?;
    apply_u32(snapshot, ENV_REFRESH_INTERVAL, &mut config.refresh_interval)?;

    apply_string(snapshot, ENV_USER, &mut config.user)?;
    apply_string(snapshot, ENV_GROUP, &mut config.group)?;
    apply_string(snapshot, ENV_SDS_UDS_PATH, &mut config.sds_uds_path)?;
    apply_string(snapshot, ENV_ZTS_REGION, &mut config.zts_region)?;

    let mut account = ConfigAccount::new(&parsed.account, &parsed.domain, &parsed.service);
    account.roles = parse_account_roles(snapshot)?;
    config.accounts = vec![account.clone()];
    Ok((config, account))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a variable, enforcing the value size limit.
fn bounded<'a>(snapshot: &'a EnvSnapshot, key: &str) -> Result<Option<&'a str>, ConfigError> {
    match snapshot.get(key) {
        Some(value) if value.len() > MAX_ENV_VALUE_BYTES => {
            Err(ConfigError::Invalid(format!("{key} exceeds size limit")))
        }
        other => Ok(other),
    }
}

/// Parses a strict boolean flag.
pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::Parse(format!("{key} must be true or false, got '{value}'")))
    }
}

/// Overrides a boolean field when the variable is set.
fn apply_bool(snapshot: &EnvSnapshot, key: &str, target: &mut bool) -> Result<(), ConfigError> {
    if let Some(value) = bounded(snapshot, key)? {
        *target = parse_bool(key, value)?;
    }
    Ok(())
}

/// Overrides an integer field when the variable is set.
fn apply_u32(
    snapshot: &EnvSnapshot,
    key: &str,
    target: &mut Option<u32>,
) -> Result<(), ConfigError> {
    if let Some(value) = bounded(snapshot, key)? {
        let parsed = value.parse::<u32>().map_err(|_| {
            ConfigError::Parse(format!("{key} must be a base-10 integer, got '{value}'"))
        })?;
        *target = Some(parsed);
    }
    Ok(())
}

/// Overrides a string field when the variable is set.
fn apply_string(
    snapshot: &EnvSnapshot,
    key: &str,
    target: &mut Option<String>,
) -> Result<(), ConfigError> {
    if let Some(value) = bounded(snapshot, key)? {
        *target = Some(value.to_string());
    }
    Ok(())
}

/// Decodes the JSON account roles map.
fn parse_account_roles(
    snapshot: &EnvSnapshot,
) -> Result<BTreeMap<String, ConfigRole>, ConfigError> {
    let Some(raw) = bounded(snapshot, ENV_ACCOUNT_ROLES)? else {
        return Ok(BTreeMap::new());
    };
    serde_json::from_str(raw)
        .map_err(|err| ConfigError::Parse(format!("{ENV_ACCOUNT_ROLES}: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
