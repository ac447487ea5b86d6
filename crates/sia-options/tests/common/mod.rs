// crates/sia-options/tests/common/mod.rs
// =============================================================================
// Module: Options Test Helpers
// Description: Shared fixtures for sia-options integration tests.
// Purpose: Provide config payloads, a fixed identity table, and a local
//          metadata server.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use sia_config::AccessProfileConfig;
use sia_config::Config;
use sia_config::ConfigAccount;
use sia_config::parse_config_bytes;
use sia_options::HttpMetadataClient;
use sia_options::MetadataClientConfig;
use sia_options::Options;
use sia_options::ResolveError;
use sia_options::ResolveRequest;
use sia_options::StaticIdentityLookup;
use sia_options::UnixIds;
use sia_options::resolve_options;
use tempfile::NamedTempFile;
use tiny_http::Response;
use tiny_http::Server;

// =============================================================================
// Identity
// =============================================================================

/// Ids the fake process runs with.
pub const CURRENT: UnixIds = UnixIds::new(1000, 1000);
/// Ids of the `nobody` user.
pub const NOBODY: UnixIds = UnixIds::new(65534, 65534);
/// Gid of the `sys` group.
pub const SYS_GID: u32 = 3;

/// Identity table shared by every suite.
pub fn identity() -> StaticIdentityLookup {
    StaticIdentityLookup::new(CURRENT)
        .with_user("root", 0, 0)
        .with_user("nobody", NOBODY.uid, NOBODY.gid)
        .with_group("sys", SYS_GID)
}

// =============================================================================
// Resolution
// =============================================================================

/// Decodes a config fixture and selects its only account.
pub fn config(json: &str) -> (Config, ConfigAccount) {
    let config = parse_config_bytes(json.as_bytes()).expect("fixture parses");
    let account = config.select_account(None).expect("fixture account");
    (config, account)
}

/// Resolves a config fixture under `/tmp` without an access profile.
pub fn resolve(json: &str) -> Result<Options, ResolveError> {
    let (config, account) = config(json);
    resolve_with(Some(&config), &account, None)
}

/// Resolves explicit inputs under `/tmp`.
pub fn resolve_with(
    config: Option<&Config>,
    account: &ConfigAccount,
    profile: Option<&AccessProfileConfig>,
) -> Result<Options, ResolveError> {
    let request = ResolveRequest {
        config,
        account,
        profile,
        sia_dir: Path::new("/tmp"),
        version: "1.0.0",
    };
    resolve_options(&request, &identity())
}

/// Writes `contents` to a fresh temporary file.
pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

// =============================================================================
// Metadata Server
// =============================================================================

/// Instance profile ARN without an access profile segment.
pub const HOCKEY_PROFILE_ARN: &str =
    "arn:aws:iam::123456789012:instance-profile/athenz.hockey-service";
/// Instance profile ARN with an access profile segment.
pub const HOCKEY_PROFILE_ARN_WITH_PROFILE: &str =
    "arn:aws:iam::123456789012:instance-profile/athenz.hockey-service@test-profile";

/// IAM info document for an ARN.
pub fn iam_info(arn: &str) -> String {
    serde_json::json!({
        "Code": "Success",
        "LastUpdated": "2022-05-02T19:35:12Z",
        "InstanceProfileArn": arn,
        "InstanceProfileId": "AIPAXAVLX6SDLOBM5OZWM"
    })
    .to_string()
}

/// Instance identity document for an account.
pub fn identity_document(account: &str) -> String {
    serde_json::json!({
        "accountId": account,
        "region": "us-west-2",
        "instanceId": "i-0123456789abcdef0"
    })
    .to_string()
}

/// Local metadata server answering fixed routes.
pub struct MetadataServer {
    /// Shared server handle.
    server: Arc<Server>,
    /// Base URL.
    url: String,
    /// Worker thread.
    handle: Option<JoinHandle<()>>,
}

impl MetadataServer {
    /// Starts a server answering `(path, status, body)` routes; others get 404.
    pub fn start(routes: Vec<(&'static str, u16, String)>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind metadata server"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let worker = Arc::clone(&server);
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                let response = routes
                    .iter()
                    .find(|(path, _, _)| *path == request.url())
                    .map_or_else(
                        || Response::from_string("not found").with_status_code(404),
                        |(_, status, body)| {
                            Response::from_string(body.clone()).with_status_code(*status)
                        },
                    );
                let _ = request.respond(response);
            }
        });
        Self {
            server,
            url: format!("http://{addr}"),
            handle: Some(handle),
        }
    }

    /// Returns the base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns a client bound to this server.
    pub fn client(&self) -> HttpMetadataClient {
        HttpMetadataClient::new(MetadataClientConfig {
            endpoint: self.url.clone(),
            ..MetadataClientConfig::default()
        })
        .expect("metadata client")
    }
}

impl Drop for MetadataServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Three services owned by different users.
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
  ]
}"#;

/// Global threshold with a role override.
pub const SIA_CONFIG_THRESHOLD_ROLE: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": { "user": "root" },
    "yamas": { "user": "nobody", "group": "sys" }
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.readers": { "service": "api", "cert_threshold_to_check": 25 }
      }
    }
  ],
  "cert_threshold_to_check": 20
}"#;

/// Global threshold with a service override and an SSH threshold.
pub const SIA_CONFIG_THRESHOLD_SERVICE: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": { "user": "root" },
    "yamas": { "user": "nobody", "group": "sys", "cert_threshold_to_check": 25 }
  },
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "cert_threshold_to_check": 35,
  "sshcert_threshold_to_check": 60
}"#;

/// Per-service thresholds with no global threshold.
pub const SIA_CONFIG_SERVICE_THRESHOLDS: &str = r#"{
  "service": "api",
  "services": {
    "api": { "cert_threshold_to_check": 35 },
    "ui": { "user": "root", "cert_threshold_to_check": 35 },
    "yamas": { "user": "nobody", "group": "sys", "cert_threshold_to_check": 25 }
  },
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "sshcert_threshold_to_check": 60
}"#;

/// Uniform per-service thresholds with a role override and no global value.
pub const SIA_CONFIG_ROLE_SERVICE_THRESHOLDS: &str = r#"{
  "service": "api",
  "services": {
    "api": { "cert_threshold_to_check": 20 },
    "ui": { "user": "root", "cert_threshold_to_check": 20 },
    "yamas": { "user": "nobody", "group": "sys", "cert_threshold_to_check": 20 }
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.readers": { "service": "api", "cert_threshold_to_check": 25 }
      }
    }
  ]
}"#;

/// Services map that omits the primary service.
pub const SIA_NO_SERVICE2: &str = r#"{
  "service": "api",
  "services": {
    "ui": {},
    "yamas": {}
  },
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ]
}"#;

/// Primary service only, with regional STS enabled.
pub const SIA_NO_SERVICES: &str = r#"{
  "service": "api",
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "regionalsts": true
}"#;

/// Role key generation with two roles.
pub const SIA_GENERATE_ROLE_KEY: &str = r#"{
  "service": "api",
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "sports:role.readers": {},
        "sports:role.writers": { "service": "api" }
      }
    }
  ],
  "generate_role_key": true
}"#;

/// Key rotation enabled.
pub const SIA_ROTATE_KEY: &str = r#"{
  "service": "api",
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "rotate_key": true
}"#;

/// Several services sharing one owner.
pub const SIA_CONFIG_SAME_USER: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": {},
    "yamas": { "user": "nobody" }
  },
  "accounts": [
    { "domain": "athenz", "user": "nobody", "account": "123456789012" }
  ],
  "drop_privileges": true
}"#;

/// Shared owner with roles inheriting it.
pub const SIA_CONFIG_SAME_USER_WITH_ROLES: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": {}
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.readers": { "service": "api" },
        "athenz:role.writers": { "service": "ui", "user": "nobody" }
      }
    }
  ],
  "drop_privileges": true
}"#;

/// Shared service owner with a role owned by another user.
pub const SIA_CONFIG_SAME_USER_ROLE_MISMATCH: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": {}
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.readers": { "service": "api", "user": "root" }
      }
    }
  ],
  "drop_privileges": true
}"#;

/// Mixed service owners with roles.
pub const SIA_CONFIG_WITH_ROLES: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "ui": { "user": "root" }
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.readers": { "service": "api" }
      }
    }
  ],
  "drop_privileges": true
}"#;

/// Access tokens across three services.
pub const SIA_CONFIG_WITH_ACCESS_TOKENS: &str = r#"{
  "service": "api",
  "services": {
    "api": {},
    "splunk": {},
    "logger": {}
  },
  "accounts": [
    {
      "domain": "athenz",
      "user": "nobody",
      "account": "123456789012",
      "roles": {
        "athenz:role.deployers": {}
      }
    }
  ],
  "access_tokens": {
    "reader": { "domain": "athenz.demo", "roles": ["reader"] },
    "poweruser": { "domain": "athenz.demo", "roles": ["reader-admin"], "expires_in": 10800 },
    "consumer": { "domain": "athenz.demo", "roles": ["reader", "reader-admin"] },
    "writer": {
      "roles": ["athenz.demo:role.writer", "athenz.demo:role.writer-admin"],
      "expires_in": 10800
    },
    "splunk": { "service": "logger", "domain": "athenz.demo", "roles": ["splunk"] },
    "all": { "domain": "athenz.demo", "roles": ["*"] }
  }
}"#;

/// Builds a single-token config around the `api` service.
pub fn access_token_config(token: &serde_json::Value) -> String {
    serde_json::json!({
        "service": "api",
        "services": { "api": {}, "logger": {} },
        "accounts": [
            {
                "domain": "athenz",
                "user": "nobody",
                "account": "123456789012",
                "roles": { "athenz:role.deployers": {}, "readers": {} }
            }
        ],
        "access_tokens": { "token": token }
    })
    .to_string()
}

/// Access profile with a role threshold override.
pub const PROFILE_CONFIG: &str = r#"{
  "profile": "test-profile",
  "profile_restrict_to": "us-west-2",
  "roles": {
    "athenz:role.readers": { "cert_threshold_to_check": 40 }
  }
}"#;
