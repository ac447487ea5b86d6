// crates/sia-options/src/bootstrap.rs
// ============================================================================
// Module: Configuration Bootstrap
// Description: Source selection for account and access-profile config.
// Purpose: Try the config files first and fall back to instance metadata.
// Dependencies: sia-config
// ============================================================================

//! ## Overview
//! This is the only place where a failed source is tolerated. Each fallback
//! is recorded on the audit sink with the error that triggered it; when the
//! fallback fails too the caller receives [`ResolveError::Unresolvable`].
//!
//! The caller's region becomes the ZTS region of a file config when regional
//! STS is enabled and the file names no ZTS region.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use sia_config::AccessProfileConfig;
use sia_config::Config;
use sia_config::ConfigAccount;
use sia_config::load_access_profile_file;
use sia_config::read_config_file;

use crate::audit::ResolutionAuditEvent;
use crate::audit::ResolutionAuditSink;
use crate::audit::ResolutionStage;
use crate::metadata::MetadataClient;
use crate::options::ResolveError;
use crate::profile::DEFAULT_PROFILE_SEPARATOR;
use crate::profile::fetch_account_id;
use crate::profile::init_profile_config;

// ============================================================================
// SECTION: Account Config
// ============================================================================

/// Regional STS settings supplied by the caller rather than the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionSettings<'a> {
    /// Enables regional STS even when the file does not.
    pub use_regional_sts: bool,
    /// Region of the running host.
    pub region: Option<&'a str>,
}

/// Merges caller region settings into a config.
///
/// The region becomes the ZTS region only when regional STS is enabled and
/// the config names no ZTS region of its own.
pub fn apply_region(config: &mut Config, settings: RegionSettings<'_>) {
    config.use_regional_sts |= settings.use_regional_sts;
    let has_region =
        config.zts_region.as_deref().is_some_and(|region| !region.trim().is_empty());
    if config.use_regional_sts
        && !has_region
        && let Some(region) = settings.region.map(str::trim).filter(|region| !region.is_empty())
    {
        config.zts_region = Some(region.to_string());
    }
}

/// Loads the config file and selects the host's account block.
///
/// The account id is fetched from instance metadata only when the file
/// declares several account blocks.
///
/// # Errors
///
/// Returns [`ResolveError`] when the file is unusable or the account id
/// cannot be determined.
pub fn init_file_config(
    path: &Path,
    metadata: &dyn MetadataClient,
    region: RegionSettings<'_>,
) -> Result<(Config, ConfigAccount), ResolveError> {
    let mut config = read_config_file(path)?;
    let account_id =
        if config.accounts.len() > 1 { Some(fetch_account_id(metadata)?) } else { None };
    let account = config.select_account(account_id.as_deref())?;
    apply_region(&mut config, region);
    Ok((config, account))
}

/// Loads the account config from the file, falling back to the instance
/// profile ARN.
///
/// The config is `None` when the fallback was used.
///
/// # Errors
///
/// Returns [`ResolveError::Unresolvable`] when both sources fail.
pub fn load_account_config(
    path: &Path,
    metadata: &dyn MetadataClient,
    region: RegionSettings<'_>,
    role_suffix: &str,
    audit: &dyn ResolutionAuditSink,
) -> Result<(Option<Config>, ConfigAccount), ResolveError> {
    let file_err = match init_file_config(path, metadata, region) {
        Ok((config, account)) => return Ok((Some(config), account)),
        Err(err) => err,
    };
    audit.record(&ResolutionAuditEvent::config_fallback(file_err.to_string()));
    match init_profile_config(metadata, role_suffix, DEFAULT_PROFILE_SEPARATOR) {
        Ok((account, _)) => Ok((None, account)),
        Err(profile_err) => Err(reject(
            audit,
            ResolutionStage::AccountConfig,
            &format!("config file: {file_err}; instance profile: {profile_err}"),
        )),
    }
}

// ============================================================================
// SECTION: Access Profile
// ============================================================================

/// Loads the access profile from the file, falling back to the profile
/// segment of the instance profile ARN.
///
/// `None` means the ARN carries no profile segment.
///
/// # Errors
///
/// Returns [`ResolveError::Unresolvable`] when both sources fail.
pub fn load_access_profile(
    path: &Path,
    metadata: &dyn MetadataClient,
    role_suffix: &str,
    audit: &dyn ResolutionAuditSink,
) -> Result<Option<AccessProfileConfig>, ResolveError> {
    let file_err = match load_access_profile_file(path) {
        Ok(profile) => return Ok(Some(profile)),
        Err(err) => err,
    };
    audit.record(&ResolutionAuditEvent::profile_fallback(file_err.to_string()));
    match init_profile_config(metadata, role_suffix, DEFAULT_PROFILE_SEPARATOR) {
        Ok((_, profile)) => Ok(profile),
        Err(profile_err) => Err(reject(
            audit,
            ResolutionStage::AccessProfile,
            &format!("profile file: {file_err}; instance profile: {profile_err}"),
        )),
    }
}

/// Records a rejection and builds the matching error.
fn reject(audit: &dyn ResolutionAuditSink, stage: ResolutionStage, detail: &str) -> ResolveError {
    audit.record(&ResolutionAuditEvent::options_rejected(stage, detail));
    ResolveError::Unresolvable(detail.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
