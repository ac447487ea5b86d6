// crates/sia-options/src/lib.rs
// ============================================================================
// Module: SIA Options Library
// Description: Resolution of raw agent configuration into runtime options.
// Purpose: Produce one validated Options value at agent startup.
// Dependencies: nix, reqwest, serde, serde_json, sia-config, thiserror
// ============================================================================

//! ## Overview
//! `sia-options` turns the inputs decoded by `sia-config` into a single
//! [`Options`] value. Resolution applies defaults and precedence rules,
//! resolves file owners to numeric ids, and validates every cross-reference
//! between services, roles, and access tokens. Instance metadata is consulted
//! only by the bootstrap helpers when a config file is unusable.
//!
//! Security posture: config inputs and metadata documents are untrusted;
//! resolution fails closed and never returns partial options.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod bootstrap;
pub mod identity;
pub mod metadata;
pub mod options;
pub mod privilege;
pub mod profile;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ResolutionAuditEvent;
pub use audit::ResolutionAuditSink;
pub use audit::ResolutionOutcome;
pub use audit::ResolutionStage;
pub use audit::StderrAuditSink;
pub use bootstrap::RegionSettings;
pub use bootstrap::apply_region;
pub use bootstrap::init_file_config;
pub use bootstrap::load_access_profile;
pub use bootstrap::load_account_config;
pub use identity::IdentityLookup;
pub use identity::OsIdentityLookup;
pub use identity::StaticIdentityLookup;
pub use identity::UnixIds;
pub use metadata::HttpMetadataClient;
pub use metadata::MetadataClient;
pub use metadata::MetadataClientConfig;
pub use metadata::MetadataError;
pub use options::AccessToken;
pub use options::DEFAULT_FILE_MODE;
pub use options::DEFAULT_TOKEN_EXPIRY;
pub use options::Options;
pub use options::ResolveError;
pub use options::Role;
pub use options::Service;
pub use privilege::PrivilegeDrop;
pub use privilege::role_service_owner;
pub use privilege::runs_as;
pub use profile::DEFAULT_PROFILE_SEPARATOR;
pub use profile::DEFAULT_ROLE_SUFFIX;
pub use profile::fetch_account_id;
pub use profile::init_profile_config;
pub use resolver::ResolveRequest;
pub use resolver::resolve_options;
