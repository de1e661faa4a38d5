// # DNS Provider Trait
//
// Defines the interface for reading and updating DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `cf-ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::DnsProvider;
//
// let state = provider.get_record("zone-id", "record-id").await?;
// let updated = provider.update_record("zone-id", &intent).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record type as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Any other type (CNAME, TXT, ...); never managed
    Other(String),
}

impl RecordType {
    /// Parse a provider type string; unknown types are kept verbatim
    pub fn parse(s: &str) -> Self {
        match s {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            other => RecordType::Other(other.to_string()),
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(s) => s,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(RecordType::parse(&s))
    }
}

/// Current state of a record, fetched fresh every cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState {
    /// Provider-assigned record identifier
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Current record content
    #[serde(default)]
    pub content: String,
    /// Whether traffic is routed through the provider's edge
    #[serde(default)]
    pub proxied: bool,
}

/// Desired state for one record in one cycle
///
/// Type, name and proxied are copied from the fetched [`RecordState`];
/// only content and comment are decided by cf-ddns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateIntent {
    /// Record identifier (path parameter, not part of the body)
    #[serde(skip)]
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record name
    pub name: String,
    /// New content (the resolved address)
    pub content: String,
    /// Proxy flag
    pub proxied: bool,
    /// Audit comment carrying the cycle timestamp
    pub comment: String,
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// Providers perform single-shot API calls and report success or failure.
/// They do not retry, do not cache record state between calls, and do not
/// decide whether an update is needed. That belongs to the reconciler.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the current state of one record
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone holding the record
    /// - `record_id`: Provider-assigned record identifier
    ///
    /// # Returns
    ///
    /// - `Ok(RecordState)`: The record's current state
    /// - `Err(Error)`: If the record doesn't exist or the request failed
    async fn get_record(&self, zone_id: &str, record_id: &str)
    -> Result<RecordState, crate::Error>;

    /// Overwrite a record with the given intent
    ///
    /// Submitting content equal to the current content is allowed and must
    /// be safe.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordState)`: The record as stored after the update
    /// - `Err(Error)`: If the update failed
    async fn update_record(
        &self,
        zone_id: &str,
        intent: &UpdateIntent,
    ) -> Result<RecordState, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
