// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for cf-ddns.
//
// ## Behaviour
//
// - One HTTP request per trait call (GET to read, PATCH to update)
// - Full error propagation to the reconciler, no retry or backoff here
// - HTTP timeout configured (30 seconds)
// - Specific error mapping for HTTP status codes (401/403, 404, 429, 5xx)
// - Dry-run mode: reads go through, updates are logged instead of sent
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - DNS Record Details: GET `/zones/:zone_id/dns_records/:record_id`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cf_ddns_core::config::{DEFAULT_API_BASE, ProviderConfig};
use cf_ddns_core::traits::{DnsProvider, DnsProviderFactory, RecordState, UpdateIntent};
use cf_ddns_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const PROVIDER_NAME: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

fn join_messages(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform GET requests
/// - Log the intended PATCH payload
/// - **NOT** modify DNS records, and report the intent back as the new state
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `api_base`: API base URL (see [`DEFAULT_API_BASE`])
    /// - `dry_run`: If true, perform GET requests but skip updates
    pub fn new(
        api_token: impl Into<String>,
        api_base: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider against the public API in live mode
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, DEFAULT_API_BASE, false)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone_id, record_id
        )
    }

    /// Turn a response into the record it carries
    async fn read_record(&self, response: reqwest::Response, what: &str) -> Result<RecordState> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, what));
        }

        let envelope: ApiEnvelope<RecordState> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} failed: {}", what, join_messages(&envelope.errors)),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                PROVIDER_NAME,
                format!("Invalid response format: {} returned no result", what),
            )
        })
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: reqwest::StatusCode, body: &str, what: &str) -> Error {
    let detail = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .map(|env| join_messages(&env.errors))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", what, detail)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, detail),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", what, status, detail),
        ),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    /// ```
    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<RecordState> {
        tracing::debug!("Fetching Cloudflare DNS record {}", record_id);

        let response = self
            .client
            .get(self.record_url(zone_id, record_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        self.read_record(response, "Record lookup").await
    }

    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {
    ///   "type": "A",
    ///   "name": "home.example.com",
    ///   "content": "203.0.113.5",
    ///   "proxied": false,
    ///   "comment": "cf-ddns 2026-10-18T12:00:00Z"
    /// }
    /// ```
    async fn update_record(&self, zone_id: &str, intent: &UpdateIntent) -> Result<RecordState> {
        let url = self.record_url(zone_id, &intent.id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                serde_json::to_string(intent)?
            );
            return Ok(RecordState {
                id: intent.id.clone(),
                record_type: intent.record_type.clone(),
                name: intent.name.clone(),
                content: intent.content.clone(),
                proxied: intent.proxied,
            });
        }

        tracing::debug!(
            "Updating Cloudflare DNS record {} -> {}",
            intent.name,
            intent.content
        );

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_token)
            .json(intent)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        self.read_record(response, "Record update").await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let provider =
                    CloudflareProvider::new(api_token.clone(), api_base.clone(), *dry_run)?;
                Ok(Box::new(provider))
            }
        }
    }
}
