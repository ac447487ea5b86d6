// crates/sia-options/src/resolver.rs
// ============================================================================
// Module: Options Resolver
// Description: Resolves raw config inputs into validated agent options.
// Purpose: Apply defaults, precedence, ownership, and cross-references once.
// Dependencies: sia-config
// ============================================================================

//! ## Overview
//! [`resolve_options`] is a pure function of its inputs plus the injected
//! [`IdentityLookup`]. It either returns a complete [`Options`] or an error;
//! there is no partially built result.
//!
//! Precedence rules:
//! - Owner: service entry, then account block, then config-level user/group.
//! - Uid: explicit uid, then user lookup, then the process euid.
//! - Gid: explicit gid, then group lookup, then the user's primary gid, then
//!   the process egid.
//! - Service threshold: service override, then global.
//! - Options threshold: the primary service's threshold.
//! - Role threshold: access-profile override, then role override, then global.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use sia_config::AccessProfileConfig;
use sia_config::AccessTokenConfig;
use sia_config::Config;
use sia_config::ConfigAccount;
use sia_config::ConfigRole;
use sia_config::ConfigService;
use sia_config::DEFAULT_REFRESH_INTERVAL;
use sia_config::DEFAULT_THRESHOLD;

use crate::identity::IdentityLookup;
use crate::identity::UnixIds;
use crate::options::AccessToken;
use crate::options::CERT_DIR_NAME;
use crate::options::DEFAULT_FILE_MODE;
use crate::options::DEFAULT_TOKEN_EXPIRY;
use crate::options::KEY_DIR_NAME;
use crate::options::Options;
use crate::options::ResolveError;
use crate::options::Role;
use crate::options::Service;
use crate::options::TOKEN_DIR_NAME;
use crate::options::WILDCARD_ROLE;
use crate::privilege::role_service_owner;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Inputs to a single resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// Raw config; `None` when only instance metadata was available.
    pub config: Option<&'a Config>,
    /// Primary account facts.
    pub account: &'a ConfigAccount,
    /// Optional access-profile config.
    pub profile: Option<&'a AccessProfileConfig>,
    /// Agent working directory.
    pub sia_dir: &'a Path,
    /// Agent version string.
    pub version: &'a str,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves agent options.
///
/// # Errors
///
/// Returns [`ResolveError::Invalid`] when a threshold, service, role, or
/// access token fails validation, and [`ResolveError::Lookup`] when an owner
/// cannot be resolved to ids.
pub fn resolve_options(
    request: &ResolveRequest<'_>,
    identity: &dyn IdentityLookup,
) -> Result<Options, ResolveError> {
    let empty = Config::default();
    let config = request.config.unwrap_or(&empty);
    let account = request.account;

    let primary = match request.config {
        Some(config) => config.service.trim(),
        None => account.service.trim(),
    };
    if primary.is_empty() {
        return Err(ResolveError::Invalid("primary service name is empty".to_string()));
    }

    let threshold = effective_threshold("threshold", &[config.threshold], DEFAULT_THRESHOLD)?;
    let ssh_threshold =
        effective_threshold("ssh threshold", &[config.ssh_threshold], DEFAULT_THRESHOLD)?;

    let owner = Owner::for_account(config, account);
    let services = resolve_services(primary, &config.services, &owner, threshold, identity)?;
    let roles = resolve_roles(&account.roles, request.profile, &services, threshold, identity)?;
    let access_tokens = resolve_access_tokens(&config.access_tokens, account, &services, identity)?;
    let primary_threshold = services.first().map_or(threshold, |service| service.threshold);

    Ok(Options {
        version: request.version.to_string(),
        sia_dir: request.sia_dir.to_path_buf(),
        account: account.account.clone(),
        domain: account.domain.clone(),
        name: format!("{}.{primary}", account.domain),
        profile: request.profile.map(|profile| profile.profile.clone()),
        profile_restrict_to: request
            .profile
            .and_then(|profile| profile.profile_restrict_to.clone()),
        services,
        roles,
        access_tokens,
        threshold: primary_threshold,
        ssh_threshold,
        ssh_host_key_type: config.ssh_host_key_type,
        token_dir: request.sia_dir.join(TOKEN_DIR_NAME),
        key_dir: request.sia_dir.join(KEY_DIR_NAME),
        cert_dir: request.sia_dir.join(CERT_DIR_NAME),
        refresh_interval: config.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
        zts_region: config.zts_region.clone(),
        use_regional_sts: config.use_regional_sts,
        drop_privileges: config.drop_privileges,
        generate_role_key: config.generate_role_key,
        rotate_key: config.rotate_key,
        san_dns_wildcard: config.san_dns_wildcard,
        san_dns_hostname: config.san_dns_hostname,
        sds_uds_path: config.sds_uds_path.as_ref().map(PathBuf::from),
        sds_uds_uid: config.sds_uds_uid,
        expiry_time: config.expiry_time,
    })
}

/// Returns the first configured threshold, or `fallback`.
///
/// Every configured candidate must be finite and positive, even when a
/// higher-precedence candidate wins.
pub(crate) fn effective_threshold(
    label: &str,
    candidates: &[Option<f64>],
    fallback: f64,
) -> Result<f64, ResolveError> {
    for value in candidates.iter().flatten() {
        if !value.is_finite() || *value <= 0.0 {
            return Err(ResolveError::Invalid(format!(
                "{label} must be a positive number, got {value}"
            )));
        }
    }
    Ok(candidates.iter().flatten().copied().next().unwrap_or(fallback))
}

// ============================================================================
// SECTION: Ownership
// ============================================================================

/// Default file owner inherited by services without their own.
#[derive(Debug, Clone, Default)]
struct Owner {
    /// Default user name.
    user: Option<String>,
    /// Default group name.
    group: Option<String>,
}

impl Owner {
    /// Account block owner, falling back to the config-level owner.
    fn for_account(config: &Config, account: &ConfigAccount) -> Self {
        Self {
            user: non_empty(account.user.as_deref())
                .or_else(|| non_empty(config.user.as_deref())),
            group: non_empty(account.group.as_deref())
                .or_else(|| non_empty(config.group.as_deref())),
        }
    }
}

/// Clones a string option, treating blank values as unset.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(ToString::to_string)
}

/// Resolves ids for an owner with optional explicit overrides.
fn resolve_ids(
    identity: &dyn IdentityLookup,
    user: Option<&str>,
    group: Option<&str>,
    uid: Option<u32>,
    gid: Option<u32>,
) -> Result<UnixIds, ResolveError> {
    let needs_user = uid.is_none() || (gid.is_none() && group.is_none());
    let user_ids = match user {
        Some(name) if needs_user => Some(identity.user(name)?),
        _ => None,
    };
    let current = identity.current();
    let uid = uid.or_else(|| user_ids.map(|ids| ids.uid)).unwrap_or(current.uid);
    let gid = match (gid, group) {
        (Some(gid), _) => gid,
        (None, Some(group)) => identity.group(group)?,
        (None, None) => user_ids.map_or(current.gid, |ids| ids.gid),
    };
    Ok(UnixIds::new(uid, gid))
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Resolves the primary service followed by every additional service.
fn resolve_services(
    primary: &str,
    declared: &BTreeMap<String, ConfigService>,
    owner: &Owner,
    threshold: f64,
    identity: &dyn IdentityLookup,
) -> Result<Vec<Service>, ResolveError> {
    let primary_entry = if declared.is_empty() {
        None
    } else {
        Some(declared.get(primary).ok_or_else(|| {
            ResolveError::Invalid(format!("services does not declare primary service {primary}"))
        })?)
    };
    let default_entry = ConfigService::default();
    let mut services = vec![resolve_service(
        primary,
        primary_entry.unwrap_or(&default_entry),
        owner,
        threshold,
        identity,
    )?];
    for (name, entry) in declared {
        if name == primary {
            continue;
        }
        if name.trim().is_empty() {
            return Err(ResolveError::Invalid("service name must be non-empty".to_string()));
        }
        services.push(resolve_service(name, entry, owner, threshold, identity)?);
    }
    Ok(services)
}

/// Resolves a single service declaration.
fn resolve_service(
    name: &str,
    entry: &ConfigService,
    owner: &Owner,
    threshold: f64,
    identity: &dyn IdentityLookup,
) -> Result<Service, ResolveError> {
    let user = non_empty(entry.user.as_deref()).or_else(|| owner.user.clone());
    let group = non_empty(entry.group.as_deref()).or_else(|| owner.group.clone());
    let ids = resolve_ids(identity, user.as_deref(), group.as_deref(), entry.uid, entry.gid)?;
    let threshold =
        effective_threshold(&format!("service {name} threshold"), &[entry.threshold], threshold)?;
    Ok(Service {
        name: name.to_string(),
        filename: non_empty(entry.filename.as_deref()),
        user,
        uid: ids.uid,
        group,
        gid: ids.gid,
        file_mode: entry.file_mode.unwrap_or(DEFAULT_FILE_MODE),
        expiry_time: entry.expiry_time,
        sds_uds_uid: entry.sds_uds_uid,
        threshold,
    })
}

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Resolves role certificates in role-name order.
fn resolve_roles(
    declared: &BTreeMap<String, ConfigRole>,
    profile: Option<&AccessProfileConfig>,
    services: &[Service],
    threshold: f64,
    identity: &dyn IdentityLookup,
) -> Result<Vec<Role>, ResolveError> {
    declared
        .iter()
        .map(|(name, entry)| resolve_role(name, entry, profile, services, threshold, identity))
        .collect()
}

/// Resolves a single role declaration.
fn resolve_role(
    name: &str,
    entry: &ConfigRole,
    profile: Option<&AccessProfileConfig>,
    services: &[Service],
    threshold: f64,
    identity: &dyn IdentityLookup,
) -> Result<Role, ResolveError> {
    if name.trim().is_empty() {
        return Err(ResolveError::Invalid("role name must be non-empty".to_string()));
    }
    let owner_name = entry.service.as_deref().unwrap_or_default();
    let owner = role_service_owner(owner_name, services)
        .ok_or_else(|| ResolveError::Invalid(format!("role {name} has no owning service")))?;
    let profile_threshold =
        profile.and_then(|profile| profile.roles.get(name)).and_then(|role| role.threshold);
    let threshold = effective_threshold(
        &format!("role {name} threshold"),
        &[profile_threshold, entry.threshold],
        threshold,
    )?;
    let user = non_empty(entry.user.as_deref());
    let ids = match user.as_deref() {
        Some(user) => identity.user(user)?,
        None => UnixIds::new(owner.uid, owner.gid),
    };
    Ok(Role {
        name: name.to_string(),
        service: owner.name.clone(),
        filename: non_empty(entry.filename.as_deref()),
        user: user.or_else(|| owner.user.clone()),
        uid: ids.uid,
        gid: ids.gid,
        file_mode: entry.file_mode.unwrap_or(DEFAULT_FILE_MODE),
        expiry_time: entry.expiry_time,
        threshold,
    })
}

// ============================================================================
// SECTION: Access Tokens
// ============================================================================

/// A validated role reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoleRef<'a> {
    /// Every role in the token domain.
    Wildcard,
    /// A role name in the token domain.
    Bare(&'a str),
    /// A role name pinned to a domain.
    Qualified {
        /// Domain of the role.
        domain: &'a str,
        /// Role name, or `*` for every role.
        role: &'a str,
    },
}

impl<'a> RoleRef<'a> {
    /// Parses `*`, `name`, or `domain:role.name`.
    fn parse(value: &'a str) -> Option<Self> {
        if value == WILDCARD_ROLE {
            return Some(Self::Wildcard);
        }
        if let Some((domain, rest)) = value.split_once(':') {
            let role = rest.strip_prefix("role.")?;
            if domain.is_empty() || role.is_empty() || !is_name(domain) {
                return None;
            }
            if role != WILDCARD_ROLE && !is_name(role) {
                return None;
            }
            return Some(Self::Qualified {
                domain,
                role,
            });
        }
        is_name(value).then_some(Self::Bare(value))
    }

    /// Returns the role name within its domain.
    const fn name(&self) -> &'a str {
        match self {
            Self::Wildcard => WILDCARD_ROLE,
            Self::Bare(role)
            | Self::Qualified {
                role, ..
            } => *role,
        }
    }
}

/// Returns true for a non-empty identifier of `[A-Za-z0-9._-]`.
fn is_name(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Resolves access token declarations in file-name order.
fn resolve_access_tokens(
    declared: &BTreeMap<String, AccessTokenConfig>,
    account: &ConfigAccount,
    services: &[Service],
    identity: &dyn IdentityLookup,
) -> Result<Vec<AccessToken>, ResolveError> {
    declared
        .iter()
        .map(|(file_name, entry)| {
            resolve_access_token(file_name, entry, account, services, identity)
        })
        .collect()
}

/// Validates and resolves a single access token declaration.
fn resolve_access_token(
    file_name: &str,
    entry: &AccessTokenConfig,
    account: &ConfigAccount,
    services: &[Service],
    identity: &dyn IdentityLookup,
) -> Result<AccessToken, ResolveError> {
    let invalid =
        |reason: String| ResolveError::Invalid(format!("access token {file_name}: {reason}"));

    if file_name.is_empty() || file_name == "." || file_name == ".." || file_name.contains('/') {
        return Err(invalid("file name must be a plain file name".to_string()));
    }

    let service_name = entry.service.as_deref().map(str::trim).filter(|name| !name.is_empty());
    let service = match service_name {
        Some(name) => services
            .iter()
            .find(|service| service.name == name)
            .ok_or_else(|| invalid(format!("unknown service {name}")))?,
        None => services.first().ok_or_else(|| invalid("no services resolved".to_string()))?,
    };

    if entry.roles.is_empty() {
        return Err(invalid("roles must be non-empty".to_string()));
    }
    let mut refs = Vec::with_capacity(entry.roles.len());
    for role in &entry.roles {
        let parsed =
            RoleRef::parse(role.trim()).ok_or_else(|| invalid(format!("invalid role {role}")))?;
        refs.push(parsed);
    }

    let qualified_domain = refs.iter().find_map(|role| match role {
        RoleRef::Qualified {
            domain, ..
        } => Some(*domain),
        _ => None,
    });
    let domain = entry
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .or(qualified_domain)
        .unwrap_or(account.domain.as_str());
    for role in &refs {
        if let RoleRef::Qualified {
            domain: role_domain, ..
        } = role
            && *role_domain != domain
        {
            return Err(invalid(format!("role domain {role_domain} does not match {domain}")));
        }
    }
    if domain == account.domain {
        for role in &refs {
            let name = role.name();
            if name != WILDCARD_ROLE && !is_declared_role(&account.roles, domain, name) {
                return Err(invalid(format!("role {name} is not declared for {domain}")));
            }
        }
    }

    let expiry = match entry.expires_in {
        Some(0) => return Err(invalid("expiry must be positive".to_string())),
        Some(seconds) => seconds,
        None => DEFAULT_TOKEN_EXPIRY,
    };

    let token_user = non_empty(entry.user.as_deref());
    let ids = match token_user.as_deref() {
        Some(user) => identity.user(user)?,
        None => UnixIds::new(service.uid, service.gid),
    };

    Ok(AccessToken {
        file_name: file_name.to_string(),
        service: service.name.clone(),
        domain: domain.to_string(),
        roles: refs.iter().map(|role| role.name().to_string()).collect(),
        expiry,
        user: token_user.or_else(|| service.user.clone()),
        uid: ids.uid,
        gid: ids.gid,
    })
}

/// Returns true when the account declares the role by bare or full name.
fn is_declared_role(roles: &BTreeMap<String, ConfigRole>, domain: &str, role: &str) -> bool {
    roles.contains_key(role) || roles.contains_key(&format!("{domain}:role.{role}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
