// crates/sia-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for sia-config integration tests.
// Purpose: Write config payloads to temporary files for the parsers.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::io::Write;

use tempfile::NamedTempFile;

/// Writes `contents` to a fresh temporary file.
pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Single-account config with three services.
pub const SIA_CONFIG: &str = r#"{
  "version": "1.0.0",
  "service": "api",
  "services": {
    "api": {},
    "ui": { "user": "root" },
    "yamas": { "user": "nobody", "group": "sys" }
  },
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "refresh_interval": 1440
}"#;

/// Config with two account blocks.
pub const SIA_CONFIG_TWO_ACCOUNTS: &str = r#"{
  "service": "api",
  "accounts": [
    { "domain": "athenz", "account": "123456789012" },
    { "domain": "sports", "account": "210987654321" }
  ]
}"#;
