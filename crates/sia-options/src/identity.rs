// crates/sia-options/src/identity.rs
// ============================================================================
// Module: OS Identity Lookup
// Description: User and group id resolution for credential file ownership.
// Purpose: Isolate OS account database access behind an injectable trait.
// Dependencies: nix
// ============================================================================

//! ## Overview
//! The resolver never touches the account database directly. It asks an
//! [`IdentityLookup`] for ids so tests can run without real users.
//! [`OsIdentityLookup`] reads the host database through `nix`;
//! [`StaticIdentityLookup`] answers from a fixed table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use nix::unistd::Group;
use nix::unistd::User;
use nix::unistd::getegid;
use nix::unistd::geteuid;
use serde::Serialize;

use crate::options::ResolveError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Numeric uid/gid pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnixIds {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

impl UnixIds {
    /// Builds an id pair.
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
        }
    }
}

/// Source of OS identity facts.
pub trait IdentityLookup {
    /// Returns the effective ids of the running process.
    fn current(&self) -> UnixIds;

    /// Resolves a user name to its uid and primary gid.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] when the user is unknown.
    fn user(&self, name: &str) -> Result<UnixIds, ResolveError>;

    /// Resolves a group name to its gid.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] when the group is unknown.
    fn group(&self, name: &str) -> Result<u32, ResolveError>;
}

// ============================================================================
// SECTION: OS Lookup
// ============================================================================

/// Identity lookup backed by the host account database.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsIdentityLookup;

impl IdentityLookup for OsIdentityLookup {
    fn current(&self) -> UnixIds {
        UnixIds::new(geteuid().as_raw(), getegid().as_raw())
    }

    fn user(&self, name: &str) -> Result<UnixIds, ResolveError> {
        match User::from_name(name) {
            Ok(Some(user)) => Ok(UnixIds::new(user.uid.as_raw(), user.gid.as_raw())),
            Ok(None) => Err(ResolveError::Lookup(format!("unknown user {name}"))),
            Err(err) => Err(ResolveError::Lookup(format!("user {name} lookup failed: {err}"))),
        }
    }

    fn group(&self, name: &str) -> Result<u32, ResolveError> {
        match Group::from_name(name) {
            Ok(Some(group)) => Ok(group.gid.as_raw()),
            Ok(None) => Err(ResolveError::Lookup(format!("unknown group {name}"))),
            Err(err) => Err(ResolveError::Lookup(format!("group {name} lookup failed: {err}"))),
        }
    }
}

// ============================================================================
// SECTION: Static Lookup
// ============================================================================

/// Identity lookup answering from a fixed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentityLookup {
    /// Ids reported for the running process.
    current: UnixIds,
    /// Known users.
    users: BTreeMap<String, UnixIds>,
    /// Known groups.
    groups: BTreeMap<String, u32>,
}

impl StaticIdentityLookup {
    /// Creates a table whose process runs with `current` ids.
    #[must_use]
    pub const fn new(current: UnixIds) -> Self {
        Self {
            current,
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Adds a user with its primary gid.
    #[must_use]
    pub fn with_user(mut self, name: &str, uid: u32, gid: u32) -> Self {
        self.users.insert(name.to_string(), UnixIds::new(uid, gid));
        self
    }

    /// Adds a group.
    #[must_use]
    pub fn with_group(mut self, name: &str, gid: u32) -> Self {
        self.groups.insert(name.to_string(), gid);
        self
    }
}

impl IdentityLookup for StaticIdentityLookup {
    fn current(&self) -> UnixIds {
        self.current
    }

    fn user(&self, name: &str) -> Result<UnixIds, ResolveError> {
        self.users
            .get(name)
            .copied()
            .ok_or_else(|| ResolveError::Lookup(format!("unknown user {name}")))
    }

    fn group(&self, name: &str) -> Result<u32, ResolveError> {
        self.groups
            .get(name)
            .copied()
            .ok_or_else(|| ResolveError::Lookup(format!("unknown group {name}")))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
