//! Public address resolution
//!
//! The [`AddressResolver`] asks an [`AddressSource`] for the host's egress
//! address twice, once per IP family, and folds the answers into a
//! [`ResolvedAddresses`] pair. Resolution never fails as a whole: a family
//! whose lookup errors is left empty and the failure is logged.

use crate::traits::{AddressSource, IpFamily};
use tracing::{info, warn};

/// Addresses resolved for one cycle
///
/// An empty string means the family could not be resolved this cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    pub ipv4: String,
    pub ipv6: String,
}

impl ResolvedAddresses {
    /// Create a resolved pair; pass `""` for an unresolved family
    pub fn new(ipv4: impl Into<String>, ipv6: impl Into<String>) -> Self {
        Self {
            ipv4: ipv4.into(),
            ipv6: ipv6.into(),
        }
    }

    /// Address for a family, `None` when unresolved
    pub fn get(&self, family: IpFamily) -> Option<&str> {
        let value = match family {
            IpFamily::V4 => &self.ipv4,
            IpFamily::V6 => &self.ipv6,
        };
        if value.is_empty() { None } else { Some(value) }
    }
}

/// Resolves the host's public IPv4 and IPv6 addresses
pub struct AddressResolver {
    source: Box<dyn AddressSource>,
}

impl AddressResolver {
    /// Create a resolver backed by the given source
    pub fn new(source: Box<dyn AddressSource>) -> Self {
        Self { source }
    }

    /// Resolve both families
    ///
    /// The two lookups run concurrently and do not affect each other.
    pub async fn resolve(&self) -> ResolvedAddresses {
        let (ipv4, ipv6) = tokio::join!(
            self.resolve_family(IpFamily::V4),
            self.resolve_family(IpFamily::V6),
        );

        ResolvedAddresses { ipv4, ipv6 }
    }

    async fn resolve_family(&self, family: IpFamily) -> String {
        match self.source.fetch_via(family).await {
            Ok(body) => {
                let address = body.trim().to_string();
                if address.is_empty() {
                    warn!("Resolver returned an empty body for {}", family);
                } else {
                    info!("Resolved {}: {}", family, address);
                }
                address
            }
            Err(e) => {
                warn!("Couldn't resolve {}: {}", family, e);
                String::new()
            }
        }
    }
}
