//! Reconciliation runner
//!
//! The DdnsEngine is responsible for:
//! - Resolving public addresses once at startup
//! - Creating the DNS provider client
//! - Driving one reconciliation cycle (run-once) or a cycle per tick (loop)
//! - Stopping cleanly on cancellation
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   (ipv4, ipv6)   ┌─────────────────┐
//! │AddressResolver│ ───────────────▶ │ RecordReconciler│
//! └───────────────┘                  └─────────────────┘
//!         ▲                                   │
//!         │            ┌──────────────┐       ▼
//!         └─────────── │  DdnsEngine  │   DnsProvider
//!                      └──────────────┘
//!                       ▲            │
//!          timer tick ──┘            └──▶ EngineEvent
//!          shutdown   ──┘
//! ```
//!
//! ## States
//!
//! `Idle → Running(cycle) → {WaitingForTick, ShuttingDown}`. Cancellation is
//! only observed while waiting for the next tick, so an in-flight cycle always
//! finishes before shutdown.
//!
//! Addresses are resolved once, at the start of the first cycle, and reused
//! by every later tick.

use crate::config::{DdnsConfig, ProviderConfig, RunMode};
use crate::error::Result;
use crate::reconciler::{CycleReport, RecordReconciler};
use crate::resolver::{AddressResolver, ResolvedAddresses};
use crate::traits::{AddressSource, DnsProviderFactory};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Capacity of the engine event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        records_count: usize,
    },

    /// A reconciliation cycle began
    CycleStarted {
        cycle: u64,
    },

    /// A reconciliation cycle returned
    CycleCompleted {
        cycle: u64,
        updated: usize,
        skipped: usize,
        failed: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core cf-ddns engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`], passing the cancellation receiver
/// 3. In run-once mode `run` returns after the first cycle; in loop mode it
///    returns once cancellation fires
///
/// ## Threading
///
/// All cycles run sequentially on the caller's task. Cycle N+1 never starts
/// before cycle N has returned.
pub struct DdnsEngine {
    /// Public address lookups
    resolver: AddressResolver,

    /// Builds the DNS provider client during the first cycle
    provider_factory: Box<dyn DnsProviderFactory>,

    /// Provider configuration handed to the factory
    provider_config: ProviderConfig,

    /// Zone holding the managed records
    zone_id: String,

    /// Record identifiers, in processing order
    records: Vec<String>,

    /// Run once or loop
    mode: RunMode,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// The configuration is validated here; nothing touches the network
    /// until [`run`](Self::run) is called.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn AddressSource>,
        provider_factory: Box<dyn DnsProviderFactory>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            resolver: AddressResolver::new(source),
            provider_factory,
            records: config.record_ids(),
            provider_config: config.provider,
            zone_id: config.zone_id,
            mode: config.mode,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// The first cycle is mandatory: if the provider client cannot be
    /// created, the error is returned and no loop is started. Per-record
    /// failures never surface here.
    ///
    /// A dropped `shutdown_rx` sender counts as cancellation.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Run-once finished, or loop mode shut down
    /// - `Err(Error)`: Fatal error during the first cycle
    pub async fn run(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            records_count: self.records.len(),
        });

        self.emit_event(EngineEvent::CycleStarted { cycle: 1 });
        let addresses = self.resolver.resolve().await;
        info!(
            "Resolved addresses: ipv4={:?} ipv6={:?}",
            addresses.ipv4, addresses.ipv6
        );

        let provider = match self.provider_factory.create(&self.provider_config) {
            Ok(provider) => provider,
            Err(e) => {
                self.emit_event(EngineEvent::Stopped {
                    reason: format!("First cycle failed: {}", e),
                });
                return Err(e);
            }
        };
        info!("Using {} provider", provider.provider_name());
        let reconciler = RecordReconciler::new(provider, self.zone_id.clone());

        let report = reconciler.update(&self.records, &addresses).await;
        self.finish_cycle(1, &report);

        match self.mode {
            RunMode::Once => {
                self.emit_event(EngineEvent::Stopped {
                    reason: "Run-once complete".to_string(),
                });
                Ok(())
            }
            RunMode::Loop { period } => {
                self.run_loop(period, &reconciler, &addresses, shutdown_rx)
                    .await;
                Ok(())
            }
        }
    }

    async fn run_loop(
        &self,
        period: Duration,
        reconciler: &RecordReconciler,
        addresses: &ResolvedAddresses,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        info!("Entering loop mode, period {:?}", period);

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 1;

        loop {
            tokio::select! {
                biased;

                // Cancellation wins over a tick that is ready at the same time
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = ticker.tick() => {
                    cycle += 1;
                    self.emit_event(EngineEvent::CycleStarted { cycle });
                    let report = reconciler.update(&self.records, addresses).await;
                    self.finish_cycle(cycle, &report);
                }
            }
        }
    }

    fn finish_cycle(&self, cycle: u64, report: &CycleReport) {
        info!(
            "Cycle {} complete: {} updated, {} skipped, {} failed",
            cycle,
            report.updated(),
            report.skipped(),
            report.failed()
        );
        self.emit_event(EngineEvent::CycleCompleted {
            cycle,
            updated: report.updated(),
            skipped: report.skipped(),
            failed: report.failed(),
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("No event listener, dropping event");
            }
        }
    }
}
