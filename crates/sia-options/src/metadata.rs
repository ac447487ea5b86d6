// crates/sia-options/src/metadata.rs
// ============================================================================
// Module: Instance Metadata Client
// Description: Bounded HTTP reads from the instance metadata service.
// Purpose: Fetch IAM info and identity documents for fallback resolution.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! The metadata service is reached through a [`MetadataClient`] so callers
//! can substitute a fixed document source. [`HttpMetadataClient`] issues plain
//! GET requests with a timeout, redirects disabled, and a hard cap on
//! response size.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default metadata service endpoint.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";
/// IAM info document path.
pub const IAM_INFO_PATH: &str = "/latest/meta-data/iam/info";
/// Instance identity document path.
pub const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default response size limit.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metadata access errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Request could not be built or sent.
    #[error("metadata request failed: {0}")]
    Request(String),
    /// Service answered with a non-success status.
    #[error("metadata service returned status {0}")]
    Status(u16),
    /// Response body was oversized or malformed.
    #[error("metadata response invalid: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Source of instance metadata documents.
pub trait MetadataClient {
    /// Fetches the document at `path` (e.g. [`IAM_INFO_PATH`]).
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the document cannot be fetched.
    fn fetch(&self, path: &str) -> Result<Vec<u8>, MetadataError>;
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

/// Configuration for the HTTP metadata client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataClientConfig {
    /// Base endpoint URL.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for MetadataClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("sia-options/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Metadata client over blocking HTTP.
pub struct HttpMetadataClient {
    /// Client configuration.
    config: MetadataClientConfig,
    /// Parsed base endpoint.
    base: Url,
    /// HTTP client.
    client: Client,
}

impl HttpMetadataClient {
    /// Creates a metadata client.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Request`] when the endpoint is not an
    /// `http`/`https` URL or the client cannot be built.
    pub fn new(config: MetadataClientConfig) -> Result<Self, MetadataError> {
        let base = Url::parse(&config.endpoint)
            .map_err(|err| MetadataError::Request(format!("invalid endpoint: {err}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(MetadataError::Request(format!(
                "unsupported endpoint scheme: {}",
                base.scheme()
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| MetadataError::Request("http client build failed".to_string()))?;
        Ok(Self {
            config,
            base,
            client,
        })
    }
}

impl MetadataClient for HttpMetadataClient {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, MetadataError> {
        let url = self
            .base
            .join(path)
            .map_err(|err| MetadataError::Request(format!("invalid path {path}: {err}")))?;
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MetadataError::Request(format!("{path}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }
        read_response_limited(&mut response, self.config.max_response_bytes)
    }
}

/// Reads a response body while enforcing a size limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, MetadataError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| MetadataError::Body("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(MetadataError::Body("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| MetadataError::Body("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(MetadataError::Body("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
