// # Address Source Trait
//
// Defines the interface for asking an echo endpoint which public address the
// host egresses from, pinned to one IP family per call.
//
// ## Implementations
//
// - HTTP with family-bound clients: `cf-ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::traits::{AddressSource, IpFamily};
//
// let body = source.fetch_via(IpFamily::V6).await?;
// ```

use async_trait::async_trait;
use std::fmt;

/// IP family a request is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("ipv4"),
            IpFamily::V6 => f.write_str("ipv6"),
        }
    }
}

/// Trait for public-address lookups
///
/// One call issues one request whose outbound connection uses only the given
/// family. The returned body is the raw response text; callers decide what
/// counts as "unresolved".
///
/// Implementations must not retry. A failed or timed-out request is returned
/// as an error and the caller degrades that family for the cycle.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the endpoint body over the given family
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The full response body
    /// - `Err(Error)`: Transport error, timeout, non-success status, or body read failure
    async fn fetch_via(&self, family: IpFamily) -> Result<String, crate::Error>;
}
