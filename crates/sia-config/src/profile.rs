// crates/sia-config/src/profile.rs
// ============================================================================
// Module: Access Profile File Parsing
// Description: Loads the optional access-profile document.
// Purpose: Decode the profile name and role threshold overrides.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The access-profile file is optional. A missing, empty, or malformed file
//! is an error so the caller can fall back to the instance-profile ARN.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::config::AccessProfileConfig;
use crate::config::ConfigError;
use crate::config::read_bounded_file;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Loads the access-profile file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable, empty, malformed, or
/// does not name a profile.
pub fn load_access_profile_file(path: &Path) -> Result<AccessProfileConfig, ConfigError> {
    let content = read_bounded_file(path)?;
    let config: AccessProfileConfig =
        serde_json::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    if config.profile.trim().is_empty() {
        return Err(ConfigError::Invalid("access profile name must be non-empty".to_string()));
    }
    Ok(config)
}
