// crates/sia-options/src/privilege.rs
// ============================================================================
// Module: Privilege Resolution
// Description: Run-as identity and role owner selection.
// Purpose: Decide whether the agent may drop to a single unprivileged owner.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Dropping privileges is only safe when every credential file the agent
//! writes has the same owner. A mixed set keeps the current identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::options::Options;
use crate::options::Service;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Privilege decision for the running agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PrivilegeDrop {
    /// Keep the current identity.
    Retain,
    /// Switch to the shared owner ids.
    DropTo {
        /// Target uid.
        uid: u32,
        /// Target gid.
        gid: u32,
    },
}

impl PrivilegeDrop {
    /// Renders the decision as a raw id pair, `(-1, -1)` for [`Self::Retain`].
    #[must_use]
    pub fn as_raw_pair(self) -> (i64, i64) {
        match self {
            Self::Retain => (-1, -1),
            Self::DropTo {
                uid,
                gid,
            } => (i64::from(uid), i64::from(gid)),
        }
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Decides the run-as identity for resolved options.
#[must_use]
pub fn runs_as(options: &Options) -> PrivilegeDrop {
    if !options.drop_privileges {
        return PrivilegeDrop::Retain;
    }
    let mut owners = options
        .services
        .iter()
        .map(|service| (service.uid, service.gid))
        .chain(options.roles.iter().map(|role| (role.uid, role.gid)));
    let Some(first) = owners.next() else {
        return PrivilegeDrop::Retain;
    };
    if owners.all(|pair| pair == first) {
        PrivilegeDrop::DropTo {
            uid: first.0,
            gid: first.1,
        }
    } else {
        PrivilegeDrop::Retain
    }
}

/// Selects the service that owns a role certificate.
///
/// Returns the service named `owner`, else the primary service. `None` only
/// when `services` is empty.
#[must_use]
pub fn role_service_owner<'a>(owner: &str, services: &'a [Service]) -> Option<&'a Service> {
    services.iter().find(|service| service.name == owner).or_else(|| services.first())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
