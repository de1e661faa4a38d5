// # cf-ddns-core
//
// Core library for keeping DNS records pointed at this host's public addresses.
//
// ## Architecture Overview
//
// - **AddressSource**: Trait for fetching the egress address over one IP family
// - **AddressResolver**: Resolves the (ipv4, ipv6) pair, degrading failures to empty
// - **DnsProvider**: Trait for reading and updating DNS records via provider APIs
// - **RecordReconciler**: Asserts A/AAAA content for each configured record
// - **DdnsEngine**: Runs the first cycle, then optionally one cycle per tick
//
// ## Design Principles
//
// 1. **Provider is the source of truth**: Record state is fetched every cycle, never cached
// 2. **Failure isolation**: One record's failure never aborts the batch
// 3. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, ProviderConfig, RunMode};
pub use engine::{DdnsEngine, EngineEvent};
pub use error::{Error, Result};
pub use reconciler::{CycleReport, RecordOutcome, RecordReconciler, SkipReason};
pub use resolver::{AddressResolver, ResolvedAddresses};
pub use traits::{AddressSource, DnsProvider, DnsProviderFactory, IpFamily};
