// crates/sia-config/src/file.rs
// ============================================================================
// Module: SIA Config File Parsing
// Description: Loads the static sia_config document.
// Purpose: Decode a config file into a Config and its primary account.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The config file is a JSON document with strict size limits. Parsing is
//! fail-closed: unreadable, empty, or malformed files are errors and the
//! caller decides whether to fall back to instance metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::config::Config;
use crate::config::ConfigAccount;
use crate::config::ConfigError;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::config::read_bounded_file;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Decodes a config payload.
///
/// # Errors
///
/// Returns [`ConfigError`] when the payload is empty, too large, or not a
/// valid config document.
pub fn parse_config_bytes(bytes: &[u8]) -> Result<Config, ConfigError> {
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config payload exceeds size limit".to_string()));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConfigError::Invalid("empty config payload".to_string()));
    }
    serde_json::from_slice(bytes).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Reads and decodes a config file without selecting an account.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or decoded, or when
/// it does not name a primary service.
pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = read_bounded_file(path)?;
    let config = parse_config_bytes(content.as_bytes())?;
    if config.service.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "missing required service field from the config file".to_string(),
        ));
    }
    Ok(config)
}

/// Loads a config file and selects its primary account.
///
/// `account_id` is only required when the file declares several accounts.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unusable or no account can be
/// selected.
pub fn load_config_file(
    path: &Path,
    account_id: Option<&str>,
) -> Result<(Config, ConfigAccount), ConfigError> {
    let config = read_config_file(path)?;
    let account = config.select_account(account_id)?;
    Ok((config, account))
}
