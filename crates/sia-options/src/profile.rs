// crates/sia-options/src/profile.rs
// ============================================================================
// Module: Instance Profile Resolution
// Description: Derives identity facts from instance metadata documents.
// Purpose: Provide the file-less fallback for account and profile config.
// Dependencies: serde, serde_json, sia-config
// ============================================================================

//! ## Overview
//! The instance profile ARN encodes `<domain>.<service>[@<profile>]` after the
//! `instance-profile/` prefix, optionally followed by a role suffix. The
//! identity document supplies the account id when a config file declares
//! several account blocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use sia_config::AccessProfileConfig;
use sia_config::ConfigAccount;
use sia_config::arn::INSTANCE_PROFILE_RESOURCE_PREFIX;
use sia_config::parse_role_arn;

use crate::metadata::IAM_INFO_PATH;
use crate::metadata::IDENTITY_DOCUMENT_PATH;
use crate::metadata::MetadataClient;
use crate::metadata::MetadataError;
use crate::options::ResolveError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between the role name and the access profile name.
pub const DEFAULT_PROFILE_SEPARATOR: char = '@';
/// Suffix trimmed from instance profile role names.
pub const DEFAULT_ROLE_SUFFIX: &str = "-service";

// ============================================================================
// SECTION: Documents
// ============================================================================

/// IAM info document subset.
#[derive(Debug, Deserialize)]
struct IamInfo {
    /// Result code; absent or `Success` when the profile is attached.
    #[serde(rename = "Code")]
    code: Option<String>,
    /// Attached instance profile ARN.
    #[serde(rename = "InstanceProfileArn", default)]
    instance_profile_arn: String,
}

/// Instance identity document subset.
#[derive(Debug, Deserialize)]
struct IdentityDocument {
    /// Cloud account id.
    #[serde(rename = "accountId", default)]
    account_id: String,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Builds the primary account and optional access profile from the instance
/// profile ARN.
///
/// A missing profile segment yields `None` rather than an error.
///
/// # Errors
///
/// Returns [`ResolveError::Metadata`] when the IAM info document cannot be
/// fetched, is malformed, or carries a malformed ARN.
pub fn init_profile_config(
    metadata: &dyn MetadataClient,
    role_suffix: &str,
    profile_separator: char,
) -> Result<(ConfigAccount, Option<AccessProfileConfig>), ResolveError> {
    let body = metadata.fetch(IAM_INFO_PATH)?;
    let info: IamInfo = serde_json::from_slice(&body)
        .map_err(|err| MetadataError::Body(format!("iam info: {err}")))?;
    if let Some(code) = info.code.as_deref()
        && code != "Success"
    {
        return Err(MetadataError::Body(format!("iam info code {code}")).into());
    }
    if info.instance_profile_arn.trim().is_empty() {
        return Err(MetadataError::Body("iam info has no instance profile arn".to_string()).into());
    }
    let parsed = parse_role_arn(
        &info.instance_profile_arn,
        INSTANCE_PROFILE_RESOURCE_PREFIX,
        role_suffix,
        Some(profile_separator),
    )
    .map_err(|err| MetadataError::Body(err.to_string()))?;

    let account = ConfigAccount::new(&parsed.account, &parsed.domain, &parsed.service);
    let profile = parsed.profile.map(|profile| AccessProfileConfig {
        profile,
        ..AccessProfileConfig::default()
    });
    Ok((account, profile))
}

/// Reads the account id from the instance identity document.
///
/// # Errors
///
/// Returns [`ResolveError::Metadata`] when the document is unavailable or has
/// no account id.
pub fn fetch_account_id(metadata: &dyn MetadataClient) -> Result<String, ResolveError> {
    let body = metadata.fetch(IDENTITY_DOCUMENT_PATH)?;
    let document: IdentityDocument = serde_json::from_slice(&body)
        .map_err(|err| MetadataError::Body(format!("identity document: {err}")))?;
    if document.account_id.trim().is_empty() {
        return Err(MetadataError::Body("identity document has no account id".to_string()).into());
    }
    Ok(document.account_id)
}
