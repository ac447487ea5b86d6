// crates/sia-config/src/lib.rs
// ============================================================================
// Module: SIA Config Library
// Description: Raw configuration model and its three input parsers.
// Purpose: Decode file, environment, and access-profile inputs fail-closed.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `sia-config` decodes the inputs the host identity agent reads at startup:
//! the `sia_config` JSON file, the `ATHENZ_SIA_*` environment, and the
//! optional access-profile file. It also parses IAM role and
//! instance-profile ARNs into identity facts. Nothing here applies defaults
//! or cross-references; see `sia-options` for resolution.
//!
//! Security posture: config inputs are untrusted; every parser fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod arn;
pub mod config;
pub mod env;
pub mod file;
pub mod profile;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use arn::ParsedArn;
pub use arn::parse_role_arn;
pub use config::*;
pub use env::EnvSnapshot;
pub use env::build_env_config;
pub use file::load_config_file;
pub use file::parse_config_bytes;
pub use file::read_config_file;
pub use profile::load_access_profile_file;
