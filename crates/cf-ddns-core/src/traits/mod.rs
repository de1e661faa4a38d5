//! Core traits for cf-ddns
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Fetch the public address over one IP family
//! - [`DnsProvider`]: Read and update DNS records via provider APIs

pub mod address_source;
pub mod dns_provider;

pub use address_source::{AddressSource, IpFamily};
pub use dns_provider::{DnsProvider, DnsProviderFactory, RecordState, RecordType, UpdateIntent};
