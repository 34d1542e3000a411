//! In-process host runtime with observable reference counts
//!
//! Objects are registered by the "host" with one reference of its own,
//! columns add and drop references through the bridge, and an object is
//! reclaimed the moment its count reaches zero. Used as the test double
//! for column lifecycles and as a leak checker in integration tests.

use super::ReferenceBridge;
use crate::errors::{BridgeError, BridgeOp};
use crate::handle::Handle;
use crate::logging::trace;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Per-object bookkeeping, mutated under the map's shard lock.
#[derive(Debug, Default, Clone, Copy)]
struct ObjectState {
    refcount: u64,
    acquires: u64,
    releases: u64,
    live: bool,
    rejected: bool,
}

impl ObjectState {
    #[inline]
    fn outstanding(&self) -> u64 {
        self.acquires.saturating_sub(self.releases)
    }
}

/// Counting host runtime. Thread-safe: per-object state sits behind
/// `DashMap` shard locks and totals are atomics.
#[derive(Debug)]
pub struct CountingBridge {
    objects: DashMap<Handle, ObjectState>,
    history: Mutex<Vec<(BridgeOp, Handle)>>,
    recording: AtomicBool,
    available: AtomicBool,
    total_acquires: AtomicU64,
    total_releases: AtomicU64,
}

impl Default for CountingBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingBridge {
    pub fn new() -> Self {
        Self {
            objects: DashMap::with_capacity(64),
            history: Mutex::new(Vec::new()),
            recording: AtomicBool::new(true),
            available: AtomicBool::new(true),
            total_acquires: AtomicU64::new(0),
            total_releases: AtomicU64::new(0),
        }
    }

    /// Create a host object at `handle` holding the host's own reference.
    ///
    /// Registering a reclaimed address revives it; per-handle call counts
    /// are cumulative across reuse. Returns false for the empty sentinel or
    /// an address that is already live.
    pub fn register(&self, handle: Handle) -> bool {
        if handle.is_empty() {
            return false;
        }

        let mut entry = self.objects.entry(handle).or_default();
        if entry.live {
            return false;
        }
        entry.live = true;
        entry.refcount = 1;
        trace!(event = "host_register", handle = %handle);
        true
    }

    /// Drop the host's own reference, as user code letting go of the object.
    pub fn drop_host_ref(&self, handle: Handle) -> Result<(), BridgeError> {
        let mut entry = self
            .objects
            .get_mut(&handle)
            .filter(|state| state.live && state.refcount > state.outstanding())
            .ok_or(BridgeError::InvalidHandle { handle })?;

        Self::decrement(&mut entry, handle);
        Ok(())
    }

    /// Make every subsequent call fail with [`BridgeError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Have the runtime report `handle` as not live, for both calls.
    pub fn reject(&self, handle: Handle) {
        self.objects.entry(handle).or_default().rejected = true;
    }

    pub fn accept(&self, handle: Handle) {
        if let Some(mut entry) = self.objects.get_mut(&handle) {
            entry.rejected = false;
        }
    }

    /// Current host reference count; zero once reclaimed or if unknown.
    pub fn refcount(&self, handle: Handle) -> u64 {
        self.objects.get(&handle).map_or(0, |s| s.refcount)
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.objects.get(&handle).map_or(false, |s| s.live)
    }

    pub fn acquires(&self, handle: Handle) -> u64 {
        self.objects.get(&handle).map_or(0, |s| s.acquires)
    }

    pub fn releases(&self, handle: Handle) -> u64 {
        self.objects.get(&handle).map_or(0, |s| s.releases)
    }

    /// References acquired through the bridge and not yet released.
    pub fn outstanding(&self, handle: Handle) -> u64 {
        self.objects.get(&handle).map_or(0, |s| s.outstanding())
    }

    pub fn total_acquires(&self) -> u64 {
        self.total_acquires.load(Ordering::Relaxed)
    }

    pub fn total_releases(&self) -> u64 {
        self.total_releases.load(Ordering::Relaxed)
    }

    /// True when every acquire has been matched by a release.
    pub fn is_balanced(&self) -> bool {
        self.objects.iter().all(|entry| entry.acquires == entry.releases)
    }

    /// Handles with references still held through the bridge.
    pub fn leaked(&self) -> Vec<Handle> {
        let mut leaked: Vec<Handle> = self
            .objects
            .iter()
            .filter(|entry| entry.outstanding() > 0)
            .map(|entry| *entry.key())
            .collect();
        leaked.sort_by_key(|h| h.into_raw());
        leaked
    }

    /// Successful calls, in the order they happened.
    pub fn history(&self) -> Vec<(BridgeOp, Handle)> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Stop or resume appending to [`history`](Self::history). Counts are
    /// kept either way.
    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::Relaxed);
    }

    #[inline]
    fn record(&self, op: BridgeOp, handle: Handle) {
        if self.recording.load(Ordering::Relaxed) {
            self.history.lock().push((op, handle));
        }
    }

    #[inline]
    fn check_available(&self) -> Result<(), BridgeError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BridgeError::Unavailable)
        }
    }

    fn decrement(state: &mut ObjectState, handle: Handle) {
        state.refcount -= 1;
        if state.refcount == 0 {
            state.live = false;
            trace!(event = "host_reclaim", handle = %handle);
        }
    }
}

impl ReferenceBridge for CountingBridge {
    fn acquire(&self, handle: Handle) -> Result<(), BridgeError> {
        self.check_available()?;
        let invalid = BridgeError::InvalidHandle { handle };
        if handle.is_empty() {
            return Err(invalid);
        }

        {
            let mut entry = self
                .objects
                .get_mut(&handle)
                .filter(|state| state.live && !state.rejected)
                .ok_or(invalid)?;
            entry.refcount += 1;
            entry.acquires += 1;
        }

        self.total_acquires.fetch_add(1, Ordering::Relaxed);
        self.record(BridgeOp::Acquire, handle);
        Ok(())
    }

    fn release(&self, handle: Handle) -> Result<(), BridgeError> {
        self.check_available()?;
        let invalid = BridgeError::InvalidHandle { handle };
        if handle.is_empty() {
            return Err(invalid);
        }

        {
            let mut entry = self
                .objects
                .get_mut(&handle)
                .filter(|state| state.live && !state.rejected && state.outstanding() > 0)
                .ok_or(invalid)?;
            entry.releases += 1;
            Self::decrement(&mut entry, handle);
        }

        self.total_releases.fetch_add(1, Ordering::Relaxed);
        self.record(BridgeOp::Release, handle);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
