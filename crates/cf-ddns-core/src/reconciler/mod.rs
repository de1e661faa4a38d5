//! Record reconciliation
//!
//! The [`RecordReconciler`] walks the configured record identifiers in order,
//! fetches each record's current state from the provider and asserts the
//! desired content for A/AAAA records.
//!
//! ## Flow (per record)
//!
//! 1. Fetch current state; on failure log and move on
//! 2. Pick content by type (A → ipv4, AAAA → ipv6); skip other types or an
//!    unresolved family
//! 3. Submit the update; on failure log and move on
//! 4. Log the stored name/type/content
//!
//! Updates are unconditional. Content is never compared locally, so every
//! cycle re-asserts the desired state even if it already matches.

use crate::resolver::ResolvedAddresses;
use crate::traits::{DnsProvider, IpFamily, RecordState, RecordType, UpdateIntent};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Prefix of the audit comment written on every update
pub const COMMENT_PREFIX: &str = "cf-ddns";

/// Why a record was left alone this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A record, but no IPv4 address was resolved
    NoIpv4,
    /// AAAA record, but no IPv6 address was resolved
    NoIpv6,
    /// Record type is neither A nor AAAA
    UnsupportedType(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIpv4 => f.write_str("no ipv4 address resolved"),
            SkipReason::NoIpv6 => f.write_str("no ipv6 address resolved"),
            SkipReason::UnsupportedType(t) => write!(f, "type {} is not A or AAAA", t),
        }
    }
}

/// Outcome of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Update submitted and accepted
    Updated(RecordState),
    /// Policy skip, not an error
    Skipped(SkipReason),
    /// Current state could not be read
    FetchFailed(String),
    /// Update call failed
    UpdateFailed(String),
}

/// Every record visited in one cycle, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: Vec<(String, RecordOutcome)>,
}

impl CycleReport {
    /// Number of records updated
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Updated(_)))
    }

    /// Number of records skipped by policy
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped(_)))
    }

    /// Number of records whose fetch or update failed
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                RecordOutcome::FetchFailed(_) | RecordOutcome::UpdateFailed(_)
            )
        })
    }

    /// Outcome for a record identifier
    pub fn outcome(&self, record_id: &str) -> Option<&RecordOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == record_id)
            .map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Build the update intent for a fetched record
///
/// Returns the skip reason instead when the type is not managed or the
/// needed family is unresolved; no intent exists in that case.
pub fn build_intent(
    record_id: &str,
    state: &RecordState,
    addresses: &ResolvedAddresses,
    timestamp: DateTime<Utc>,
) -> Result<UpdateIntent, SkipReason> {
    let content = match state.record_type {
        RecordType::A => addresses.get(IpFamily::V4).ok_or(SkipReason::NoIpv4)?,
        RecordType::Aaaa => addresses.get(IpFamily::V6).ok_or(SkipReason::NoIpv6)?,
        RecordType::Other(ref t) => return Err(SkipReason::UnsupportedType(t.clone())),
    };

    Ok(UpdateIntent {
        id: record_id.to_string(),
        record_type: state.record_type.clone(),
        name: state.name.clone(),
        content: content.to_string(),
        proxied: state.proxied,
        comment: audit_comment(timestamp),
    })
}

/// Audit comment for a cycle, e.g. `cf-ddns 2026-10-18T12:00:00Z`
pub fn audit_comment(timestamp: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        COMMENT_PREFIX,
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Reconciles configured records against resolved addresses
pub struct RecordReconciler {
    provider: Box<dyn DnsProvider>,
    zone_id: String,
}

impl RecordReconciler {
    /// Create a reconciler for one zone
    pub fn new(provider: Box<dyn DnsProvider>, zone_id: impl Into<String>) -> Self {
        Self {
            provider,
            zone_id: zone_id.into(),
        }
    }

    /// Reconcile every record once, in the given order
    ///
    /// Never fails: each record's outcome is logged and collected in the
    /// returned report, and a failure on one record does not stop the rest.
    pub async fn update(&self, records: &[String], addresses: &ResolvedAddresses) -> CycleReport {
        let timestamp = Utc::now();
        let mut report = CycleReport::default();

        for record_id in records {
            let outcome = self.reconcile_one(record_id, addresses, timestamp).await;
            report.outcomes.push((record_id.clone(), outcome));
        }

        report
    }

    async fn reconcile_one(
        &self,
        record_id: &str,
        addresses: &ResolvedAddresses,
        timestamp: DateTime<Utc>,
    ) -> RecordOutcome {
        let state = match self.provider.get_record(&self.zone_id, record_id).await {
            Ok(state) => state,
            Err(e) => {
                error!("Couldn't get record {}: {}", record_id, e);
                return RecordOutcome::FetchFailed(e.to_string());
            }
        };

        debug!(
            "Record {} is {} ({}) proxied={}",
            record_id, state.name, state.record_type, state.proxied
        );

        let intent = match build_intent(record_id, &state, addresses, timestamp) {
            Ok(intent) => intent,
            Err(reason) => {
                match reason {
                    SkipReason::UnsupportedType(_) => {
                        warn!("Skipping record {}: {}", record_id, reason)
                    }
                    _ => info!("Skipping record {}: {}", record_id, reason),
                }
                return RecordOutcome::Skipped(reason);
            }
        };

        match self.provider.update_record(&self.zone_id, &intent).await {
            Ok(updated) => {
                info!(
                    "Updated record {} ({}) with {}",
                    updated.name, updated.record_type, updated.content
                );
                RecordOutcome::Updated(updated)
            }
            Err(e) => {
                error!(
                    "Couldn't update record {} via {}: {}",
                    record_id,
                    self.provider.provider_name(),
                    e
                );
                RecordOutcome::UpdateFailed(e.to_string())
            }
        }
    }
}
