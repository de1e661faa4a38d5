//! Test doubles and common utilities for contract tests
//!
//! These doubles record every call so tests can assert on exactly what the
//! reconciler and engine asked of their collaborators.

#![allow(dead_code)]

use cf_ddns_core::config::{DdnsConfig, ProviderConfig, RunMode};
use cf_ddns_core::error::{Error, Result};
use cf_ddns_core::traits::{
    AddressSource, DnsProvider, DnsProviderFactory, IpFamily, RecordState, RecordType,
    UpdateIntent,
};
use cf_ddns_core::EngineEvent;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// An address source with fixed answers per family
#[derive(Clone)]
pub struct MockAddressSource {
    ipv4: Option<String>,
    ipv6: Option<String>,
    fetch_call_count: Arc<AtomicUsize>,
}

impl MockAddressSource {
    /// `None` makes that family's lookup fail
    pub fn new(ipv4: Option<&str>, ipv6: Option<&str>) -> Self {
        Self {
            ipv4: ipv4.map(str::to_string),
            ipv6: ipv6.map(str::to_string),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times fetch_via() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for MockAddressSource {
    async fn fetch_via(&self, family: IpFamily) -> Result<String> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        let answer = match family {
            IpFamily::V4 => self.ipv4.clone(),
            IpFamily::V6 => self.ipv6.clone(),
        };
        answer.ok_or_else(|| Error::resolution(format!("{} unreachable", family)))
    }
}

#[derive(Default)]
struct ProviderState {
    records: HashMap<String, RecordState>,
    failing_gets: HashSet<String>,
    failing_updates: HashSet<String>,
    get_calls: Vec<String>,
    update_calls: Vec<UpdateIntent>,
}

/// A DnsProvider double backed by an in-memory record table
///
/// Clones share state, so a test can keep one handle while the engine owns another.
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `delay` (for scheduling tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Add a record the provider knows about
    pub fn with_record(self, id: &str, record_type: &str, name: &str) -> Self {
        self.state.lock().unwrap().records.insert(
            id.to_string(),
            RecordState {
                id: id.to_string(),
                record_type: RecordType::parse(record_type),
                name: name.to_string(),
                content: String::new(),
                proxied: false,
            },
        );
        self
    }

    /// Add a proxied record
    pub fn with_proxied_record(self, id: &str, record_type: &str, name: &str) -> Self {
        let provider = self.with_record(id, record_type, name);
        if let Some(r) = provider.state.lock().unwrap().records.get_mut(id) {
            r.proxied = true;
        }
        provider
    }

    /// Make get_record() fail for this id
    pub fn failing_get(self, id: &str) -> Self {
        self.state.lock().unwrap().failing_gets.insert(id.to_string());
        self
    }

    /// Make update_record() fail for this id
    pub fn failing_update(self, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_updates
            .insert(id.to_string());
        self
    }

    /// Record ids passed to get_record(), in call order
    pub fn get_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().get_calls.clone()
    }

    /// Intents passed to update_record(), in call order
    pub fn update_calls(&self) -> Vec<UpdateIntent> {
        self.state.lock().unwrap().update_calls.clone()
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn get_record(&self, _zone_id: &str, record_id: &str) -> Result<RecordState> {
        self.enter().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            state.get_calls.push(record_id.to_string());
            if state.failing_gets.contains(record_id) {
                Err(Error::http("connection reset"))
            } else {
                state
                    .records
                    .get(record_id)
                    .cloned()
                    .ok_or_else(|| Error::not_found(record_id.to_string()))
            }
        };
        self.exit();
        result
    }

    async fn update_record(&self, _zone_id: &str, intent: &UpdateIntent) -> Result<RecordState> {
        self.enter().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            state.update_calls.push(intent.clone());
            if state.failing_updates.contains(&intent.id) {
                Err(Error::provider("mock", "update rejected"))
            } else {
                let updated = RecordState {
                    id: intent.id.clone(),
                    record_type: intent.record_type.clone(),
                    name: intent.name.clone(),
                    content: intent.content.clone(),
                    proxied: intent.proxied,
                };
                state.records.insert(intent.id.clone(), updated.clone());
                Ok(updated)
            }
        };
        self.exit();
        result
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out clones of one MockDnsProvider
pub struct MockProviderFactory {
    provider: Option<MockDnsProvider>,
    create_call_count: Arc<AtomicUsize>,
}

impl MockProviderFactory {
    pub fn new(provider: MockDnsProvider) -> Self {
        Self {
            provider: Some(provider),
            create_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A factory whose create() always fails
    pub fn failing() -> Self {
        Self {
            provider: None,
            create_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle on the create() call counter
    pub fn create_call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.create_call_count)
    }
}

impl DnsProviderFactory for MockProviderFactory {
    fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        match &self.provider {
            Some(p) => Ok(Box::new(p.clone())),
            None => Err(Error::auth("invalid token")),
        }
    }
}

/// Helper to create a DdnsConfig for testing
pub fn test_config(records: &[&str], mode: RunMode) -> DdnsConfig {
    DdnsConfig {
        resolver: "http://resolver.test/ip".to_string(),
        zone_id: "zone-1".to_string(),
        provider: ProviderConfig::cloudflare("test-token"),
        records: records.iter().map(|r| r.to_string()).collect(),
        mode,
    }
}

/// Loop mode with a short period
pub fn fast_loop(millis: u64) -> RunMode {
    RunMode::Loop {
        period: Duration::from_millis(millis),
    }
}

/// Wait for the next event matching `pred`, failing the test after 5 seconds
pub async fn wait_for_event(
    rx: &mut mpsc::Receiver<EngineEvent>,
    pred: impl Fn(&EngineEvent) -> bool,
) -> EngineEvent {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = rx.recv().await {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    })
    .await;

    result
        .expect("timed out waiting for engine event")
        .expect("event channel closed")
}

/// Drain every event currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
