// crates/sia-config/src/arn.rs
// ============================================================================
// Module: IAM ARN Parsing
// Description: Parses role and instance-profile ARNs into identity facts.
// Purpose: Derive account, domain, service, and profile from an IAM ARN.
// Dependencies: none
// ============================================================================

//! ## Overview
//! IAM role and instance-profile names encode the identity as
//! `<domain>.<service>[<suffix>][<separator><profile>]`. The parser validates
//! the ARN envelope, strips the resource prefix and path, and splits the name
//! into its parts. Any deviation is an error; there is no partial result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::config::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Resource prefix used by IAM role ARNs.
pub const ROLE_RESOURCE_PREFIX: &str = "role/";
/// Resource prefix used by instance-profile ARNs.
pub const INSTANCE_PROFILE_RESOURCE_PREFIX: &str = "instance-profile/";
/// Number of digits in a cloud account id.
const ACCOUNT_ID_LENGTH: usize = 12;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identity facts parsed from an IAM ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArn {
    /// Cloud account id.
    pub account: String,
    /// Identity domain.
    pub domain: String,
    /// Service name with any role suffix removed.
    pub service: String,
    /// Access profile name following the separator, if any.
    pub profile: Option<String>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an IAM ARN whose resource names a `<domain>.<service>` identity.
///
/// `role_suffix` is trimmed from the identity when present (an empty suffix
/// disables trimming). When `profile_separator` is set, the text after it is
/// returned as the access profile name.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the ARN envelope, resource prefix,
/// or identity name is malformed.
pub fn parse_role_arn(
    arn: &str,
    resource_prefix: &str,
    role_suffix: &str,
    profile_separator: Option<char>,
) -> Result<ParsedArn, ConfigError> {
    let fields: Vec<&str> = arn.trim().splitn(6, ':').collect();
    let [scheme, partition, service, _region, account, resource] = fields.as_slice() else {
        return Err(invalid(arn, "expected 6 colon-separated fields"));
    };
    if *scheme != "arn" || partition.is_empty() || *service != "iam" {
        return Err(invalid(arn, "not an iam arn"));
    }
    if account.len() != ACCOUNT_ID_LENGTH || !account.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(arn, "account id must be 12 digits"));
    }
    let Some(path) = resource.strip_prefix(resource_prefix) else {
        return Err(invalid(arn, &format!("resource must start with {resource_prefix}")));
    };
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return Err(invalid(arn, "missing resource name"));
    }

    let (identity, profile) = match profile_separator.and_then(|sep| name.split_once(sep)) {
        Some((_, "")) => return Err(invalid(arn, "empty access profile name")),
        Some((identity, profile)) => (identity, Some(profile.to_string())),
        None => (name, None),
    };
    let identity = if role_suffix.is_empty() {
        identity
    } else {
        identity.strip_suffix(role_suffix).unwrap_or(identity)
    };
    let Some((domain, service)) = identity.rsplit_once('.') else {
        return Err(invalid(arn, "resource name must be <domain>.<service>"));
    };
    if domain.is_empty() || service.is_empty() {
        return Err(invalid(arn, "resource name must be <domain>.<service>"));
    }

    Ok(ParsedArn {
        account: (*account).to_string(),
        domain: domain.to_string(),
        service: service.to_string(),
        profile,
    })
}

/// Builds an invalid-ARN error.
fn invalid(arn: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid(format!("invalid arn '{arn}': {reason}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
