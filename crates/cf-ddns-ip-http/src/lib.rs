// # HTTP Address Source
//
// Fetches the host's public address from a plain-text echo endpoint
// (e.g. icanhazip.com, ifconfig.me/ip), once per IP family.
//
// ## Why two clients
//
// A dual-stack socket only ever reports whichever family the OS prefers. To
// learn the IPv4 and IPv6 egress addresses separately, each family gets its
// own client whose local address is the unspecified address of that family
// (`0.0.0.0` / `::`). The connector then only dials remote addresses of the
// same family, so a v6-only request never silently falls back to v4.
//
// ## Limits
//
// - One request per call, no retries
// - Fixed 3 second timeout per request
// - Direct connections only; `HTTP_PROXY`/`HTTPS_PROXY` are ignored, since a
//   proxy would report its own egress address
// - A non-2xx response fails the family instead of treating the error page
//   body as the address

use cf_ddns_core::traits::{AddressSource, IpFamily};
use cf_ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Timeout for a single resolver request
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP echo-endpoint address source with one client per family
#[derive(Debug)]
pub struct HttpAddressSource {
    /// URL returning the caller's IP as plain text
    endpoint: String,

    /// Client whose connections are IPv4-only
    client_v4: reqwest::Client,

    /// Client whose connections are IPv6-only
    client_v6: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a new HTTP address source
    ///
    /// # Parameters
    ///
    /// - `endpoint`: URL to fetch the address from (e.g., "https://icanhazip.com")
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, RESOLVE_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::config("resolver endpoint must be specified"));
        }

        Ok(Self {
            endpoint,
            client_v4: family_client(IpFamily::V4, timeout)?,
            client_v6: family_client(IpFamily::V6, timeout)?,
        })
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self, family: IpFamily) -> &reqwest::Client {
        match family {
            IpFamily::V4 => &self.client_v4,
            IpFamily::V6 => &self.client_v6,
        }
    }
}

/// Unspecified local address that pins outbound connections to `family`
fn bind_address(family: IpFamily) -> IpAddr {
    match family {
        IpFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

fn family_client(family: IpFamily, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .local_address(bind_address(family))
        .no_proxy()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::http(format!("Failed to build {} client: {}", family, e)))
}

#[async_trait::async_trait]
impl AddressSource for HttpAddressSource {
    async fn fetch_via(&self, family: IpFamily) -> Result<String> {
        tracing::debug!("Fetching {} address from {}", family, self.endpoint);

        let response = self
            .client(family)
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("{} request failed: {}", family, e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "{} request returned HTTP {}",
                family,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Couldn't read {} result body: {}", family, e)))
    }
}
