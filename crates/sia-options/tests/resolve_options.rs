//! Options resolution tests for sia-options.
// crates/sia-options/tests/resolve_options.rs
// =============================================================================
// Module: Options Resolution Tests
// Description: Validate defaults, precedence, and ownership of resolved options.
// Purpose: Ensure a config resolves into exactly one consistent Options value.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::path::Path;

use common::CURRENT;
use common::NOBODY;
use common::SYS_GID;
use sia_config::ConfigAccount;
use sia_config::DEFAULT_THRESHOLD;
use sia_config::SshHostKeyType;
use sia_config::load_access_profile_file;
use sia_options::DEFAULT_FILE_MODE;
use sia_options::Options;
use sia_options::ResolveError;
use sia_options::Service;

/// Finds a secondary service by name.
fn secondary<'a>(options: &'a Options, name: &str) -> &'a Service {
    assert_ne!(options.services[0].name, name, "{name} is the primary service");
    options.service(name).unwrap_or_else(|| panic!("service {name} missing from secondaries"))
}

#[test]
fn resolves_profile_only_account_with_defaults() {
    let account = ConfigAccount::new("123456789012", "athenz", "hockey");
    let options = common::resolve_with(None, &account, None).unwrap();

    assert_eq!(options.domain, "athenz");
    assert_eq!(options.name, "athenz.hockey");
    assert_eq!(options.services.len(), 1);
    let primary = &options.services[0];
    assert_eq!(primary.name, "hockey");
    assert_eq!((primary.uid, primary.gid), (CURRENT.uid, CURRENT.gid));
    assert_eq!(primary.file_mode, 0o440);
    assert_eq!(primary.threshold, DEFAULT_THRESHOLD);
    assert_eq!(options.threshold, DEFAULT_THRESHOLD);
    assert_eq!(options.ssh_threshold, DEFAULT_THRESHOLD);
    assert_eq!(options.refresh_interval, 120);
    assert!(options.profile.is_none());
}

#[test]
fn resolves_config_services_and_owners() {
    let options = common::resolve(common::SIA_CONFIG).unwrap();

    assert_eq!(options.version, "1.0.0");
    assert_eq!(options.account, "123456789012");
    assert_eq!(options.name, "athenz.api");
    assert_eq!(options.services.len(), 3);

    let api = &options.services[0];
    assert_eq!(api.name, "api");
    assert_eq!(api.user.as_deref(), Some("nobody"));
    assert_eq!((api.uid, api.gid), (NOBODY.uid, NOBODY.gid));
    assert_eq!(api.file_mode, DEFAULT_FILE_MODE);
    assert_eq!(api.threshold, DEFAULT_THRESHOLD);

    let ui = secondary(&options, "ui");
    assert_eq!(ui.user.as_deref(), Some("root"));
    assert_eq!((ui.uid, ui.gid), (0, 0));

    let yamas = secondary(&options, "yamas");
    assert_eq!(yamas.user.as_deref(), Some("nobody"));
    assert_eq!(yamas.group.as_deref(), Some("sys"));
    assert_eq!((yamas.uid, yamas.gid), (NOBODY.uid, SYS_GID));

    assert_eq!(options.threshold, DEFAULT_THRESHOLD);
    assert_eq!(options.ssh_threshold, DEFAULT_THRESHOLD);
}

#[test]
fn access_profile_supplies_profile_name() {
    let profile_file = common::write_temp(common::PROFILE_CONFIG);
    let profile = load_access_profile_file(profile_file.path()).unwrap();
    let (config, account) = common::config(common::SIA_CONFIG);
    let options = common::resolve_with(Some(&config), &account, Some(&profile)).unwrap();

    assert_eq!(options.profile.as_deref(), Some("test-profile"));
    assert_eq!(options.profile_restrict_to.as_deref(), Some("us-west-2"));
    assert_eq!(options.services[0].threshold, DEFAULT_THRESHOLD);
    assert_eq!(options.threshold, DEFAULT_THRESHOLD);
}

#[test]
fn role_threshold_overrides_global() {
    let options = common::resolve(common::SIA_CONFIG_THRESHOLD_ROLE).unwrap();

    assert_eq!(options.threshold, 20.0);
    assert_eq!(options.ssh_threshold, DEFAULT_THRESHOLD);
    assert!(options.services.iter().all(|service| service.threshold == 20.0));
    assert_eq!(options.roles.len(), 1);
    assert_eq!(options.roles[0].threshold, 25.0);
}

#[test]
fn access_profile_threshold_overrides_role() {
    let profile_file = common::write_temp(common::PROFILE_CONFIG);
    let profile = load_access_profile_file(profile_file.path()).unwrap();
    let (config, account) = common::config(common::SIA_CONFIG_THRESHOLD_ROLE);
    let options = common::resolve_with(Some(&config), &account, Some(&profile)).unwrap();

    assert_eq!(options.roles[0].threshold, 40.0);
    assert_eq!(options.services[0].threshold, 20.0);
}

#[test]
fn service_threshold_overrides_global() {
    let options = common::resolve(common::SIA_CONFIG_THRESHOLD_SERVICE).unwrap();

    assert_eq!(options.services[0].threshold, 35.0);
    assert_eq!(secondary(&options, "ui").threshold, 35.0);
    assert_eq!(secondary(&options, "yamas").threshold, 25.0);
    assert_eq!(options.ssh_threshold, 60.0);
    assert_eq!(options.threshold, 35.0);
}

#[test]
fn primary_service_threshold_is_the_options_threshold() {
    let options = common::resolve(common::SIA_CONFIG_SERVICE_THRESHOLDS).unwrap();

    assert_eq!(options.services[0].name, "api");
    assert_eq!(options.services[0].threshold, 35.0);
    assert_eq!(secondary(&options, "ui").threshold, 35.0);
    assert_eq!(secondary(&options, "yamas").threshold, 25.0);
    assert_eq!(options.ssh_threshold, 60.0);
    assert_eq!(options.threshold, 35.0);
}

#[test]
fn role_threshold_with_per_service_thresholds() {
    let options = common::resolve(common::SIA_CONFIG_ROLE_SERVICE_THRESHOLDS).unwrap();

    assert_eq!(options.threshold, 20.0);
    assert_eq!(options.ssh_threshold, DEFAULT_THRESHOLD);
    assert!(options.services.iter().all(|service| service.threshold == 20.0));
    assert_eq!(options.roles[0].threshold, 25.0);
}

#[test]
fn role_threshold_ignores_owner_service_threshold() {
    let json = r#"{
      "service": "api",
      "services": { "api": { "cert_threshold_to_check": 50 } },
      "accounts": [
        {
          "domain": "athenz",
          "account": "123456789012",
          "roles": { "athenz:role.readers": { "service": "api" } }
        }
      ]
    }"#;
    let options = common::resolve(json).unwrap();
    assert_eq!(options.services[0].threshold, 50.0);
    assert_eq!(options.threshold, 50.0);
    assert_eq!(options.roles[0].threshold, DEFAULT_THRESHOLD);
}

#[test]
fn invalid_thresholds_are_rejected() {
    for threshold in ["0", "-5", "0.0"] {
        let json = format!(
            r#"{{
              "service": "api",
              "accounts": [ {{ "domain": "athenz", "account": "123456789012" }} ],
              "cert_threshold_to_check": {threshold}
            }}"#
        );
        let err = common::resolve(&json).unwrap_err();
        assert!(matches!(err, ResolveError::Invalid(_)), "{threshold}: {err}");
    }
}

#[test]
fn services_without_primary_are_rejected() {
    let err = common::resolve(common::SIA_NO_SERVICE2).unwrap_err();
    assert!(matches!(err, ResolveError::Invalid(_)));
    assert!(err.to_string().contains("primary service api"));
}

#[test]
fn empty_primary_name_is_rejected() {
    let account = ConfigAccount::new("123456789012", "athenz", "");
    let err = common::resolve_with(None, &account, None).unwrap_err();
    assert!(matches!(err, ResolveError::Invalid(_)));
}

#[test]
fn primary_only_config_resolves_single_service() {
    let options = common::resolve(common::SIA_NO_SERVICES).unwrap();

    assert_eq!(options.refresh_interval, 120);
    assert!(options.use_regional_sts);
    assert_eq!(options.zts_region, None);
    assert_eq!(options.services.len(), 1);
    assert_eq!(options.domain, "athenz");
    assert_eq!(options.name, "athenz.api");
    let api = &options.services[0];
    assert_eq!(api.user.as_deref(), Some("nobody"));
    assert_eq!((api.uid, api.gid), (NOBODY.uid, NOBODY.gid));
    assert_eq!(api.file_mode, 0o440);
}

#[test]
fn generate_role_key_propagates_with_default_file_modes() {
    let options = common::resolve(common::SIA_GENERATE_ROLE_KEY).unwrap();

    assert!(options.generate_role_key);
    assert_eq!(options.roles.len(), 2);
    let names: Vec<&str> = options.roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, ["sports:role.readers", "sports:role.writers"]);
    for role in &options.roles {
        assert_eq!(role.file_mode, 0o440);
        assert_eq!(role.service, "api");
        assert_eq!((role.uid, role.gid), (NOBODY.uid, NOBODY.gid));
    }
}

#[test]
fn rotate_key_propagates() {
    let options = common::resolve(common::SIA_ROTATE_KEY).unwrap();
    assert!(options.rotate_key);
    assert!(!options.generate_role_key);
}

#[test]
fn directories_derive_from_sia_dir() {
    let options = common::resolve(common::SIA_NO_SERVICES).unwrap();
    assert_eq!(options.sia_dir, Path::new("/tmp"));
    assert_eq!(options.token_dir, Path::new("/tmp/tokens"));
    assert_eq!(options.key_dir, Path::new("/tmp/keys"));
    assert_eq!(options.cert_dir, Path::new("/tmp/certs"));
}

#[test]
fn ssh_host_key_type_stays_unset_unless_configured() {
    let options = common::resolve(common::SIA_CONFIG).unwrap();
    assert_eq!(options.ssh_host_key_type, None);

    let json = r#"{
      "service": "api",
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ],
      "ssh_host_key_type": "rsa"
    }"#;
    let options = common::resolve(json).unwrap();
    assert_eq!(options.ssh_host_key_type, Some(SshHostKeyType::Rsa));

    let json = r#"{
      "service": "api",
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ],
      "ssh_host_key_type": "ed25519"
    }"#;
    let options = common::resolve(json).unwrap();
    assert_eq!(options.ssh_host_key_type, Some(SshHostKeyType::Ed25519));
}

#[test]
fn explicit_ids_skip_user_lookup() {
    let json = r#"{
      "service": "api",
      "services": { "api": { "user": "ghost", "uid": 4000, "gid": 4001 } },
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ]
    }"#;
    let options = common::resolve(json).unwrap();
    let api = &options.services[0];
    assert_eq!((api.uid, api.gid), (4000, 4001));
    assert_eq!(api.user.as_deref(), Some("ghost"));
}

#[test]
fn unknown_user_fails_with_lookup_error() {
    let json = r#"{
      "service": "api",
      "accounts": [ { "domain": "athenz", "user": "ghost", "account": "123456789012" } ]
    }"#;
    let err = common::resolve(json).unwrap_err();
    assert!(matches!(err, ResolveError::Lookup(_)), "{err}");
}

#[test]
fn unknown_group_fails_with_lookup_error() {
    let json = r#"{
      "service": "api",
      "services": { "api": { "group": "wheel" } },
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ]
    }"#;
    let err = common::resolve(json).unwrap_err();
    assert!(matches!(err, ResolveError::Lookup(_)), "{err}");
}

#[test]
fn config_level_owner_applies_when_account_has_none() {
    let json = r#"{
      "service": "api",
      "user": "root",
      "group": "sys",
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ]
    }"#;
    let options = common::resolve(json).unwrap();
    let api = &options.services[0];
    assert_eq!(api.user.as_deref(), Some("root"));
    assert_eq!((api.uid, api.gid), (0, SYS_GID));
}

#[test]
fn flags_and_socket_settings_propagate() {
    let json = r#"{
      "service": "api",
      "accounts": [ { "domain": "athenz", "account": "123456789012" } ],
      "san_dns_wildcard": true,
      "san_dns_hostname": true,
      "regionalsts": true,
      "sds_uds_path": "/var/run/sia/sds.sock",
      "sds_uds_uid": 1337,
      "expiry_time": 10080,
      "refresh_interval": 1440
    }"#;
    let options = common::resolve(json).unwrap();
    assert!(options.san_dns_wildcard);
    assert!(options.san_dns_hostname);
    assert!(options.use_regional_sts);
    assert_eq!(options.sds_uds_path.as_deref(), Some(Path::new("/var/run/sia/sds.sock")));
    assert_eq!(options.sds_uds_uid, Some(1337));
    assert_eq!(options.expiry_time, Some(10080));
    assert_eq!(options.refresh_interval, 1440);
}

#[test]
fn options_serialize_to_json() {
    let options = common::resolve(common::SIA_CONFIG).unwrap();
    let value = serde_json::to_value(&options).unwrap();
    assert_eq!(value["name"], "athenz.api");
    assert!(value["ssh_host_key_type"].is_null());
    assert_eq!(value["services"][0]["name"], "api");
}
