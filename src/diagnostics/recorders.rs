//! Stock observers: ordered log, atomic counters, fan-out

use super::{BridgeEvent, EventPhase, ReferenceObserver};
use crate::errors::BridgeOp;
use crate::handle::Handle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Records every event in call order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<BridgeEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Calls of `kind` on `handle`, successful or not.
    pub fn count(&self, kind: BridgeOp, handle: Handle) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind && e.handle == handle)
            .count()
    }

    /// `(kind, handle)` of successful calls, in order.
    pub fn calls(&self) -> Vec<(BridgeOp, Handle)> {
        self.events
            .lock()
            .iter()
            .filter(|e| !e.is_failure())
            .map(|e| (e.kind, e.handle))
            .collect()
    }

    pub fn failures(&self) -> Vec<BridgeEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_failure())
            .copied()
            .collect()
    }
}

impl ReferenceObserver for EventLog {
    fn record(&self, event: &BridgeEvent) {
        self.events.lock().push(*event);
    }
}

/// Lock-free event totals.
#[derive(Debug, Default)]
pub struct EventCounters {
    acquires: AtomicU64,
    releases: AtomicU64,
    failures: AtomicU64,
    teardown_failures: AtomicU64,
}

/// Point-in-time copy of [`EventCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub acquires: u64,
    pub releases: u64,
    pub failures: u64,
    pub teardown_failures: u64,
}

impl EventCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            acquires: self.acquires.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            teardown_failures: self.teardown_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.acquires.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.teardown_failures.store(0, Ordering::Relaxed);
    }
}

impl ReferenceObserver for EventCounters {
    fn record(&self, event: &BridgeEvent) {
        if event.is_failure() {
            self.failures.fetch_add(1, Ordering::Relaxed);
            if event.phase == EventPhase::Teardown {
                self.teardown_failures.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }

        match event.kind {
            BridgeOp::Acquire => self.acquires.fetch_add(1, Ordering::Relaxed),
            BridgeOp::Release => self.releases.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Forwards each event to several observers.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn ReferenceObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ReferenceObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ReferenceObserver for ObserverSet {
    fn record(&self, event: &BridgeEvent) {
        for observer in &self.observers {
            observer.record(event);
        }
    }
}
