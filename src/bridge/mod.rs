//! Reference bridge - lifetime events into host-runtime refcount calls
//!
//! Design: a two-method adapter injected into every column:
//! 1. `acquire` when a cell starts holding a handle
//! 2. `release` when a cell stops holding it
//!
//! Adapters:
//! - [`CountingBridge`]: in-process host runtime with per-handle counts
//! - [`CallbackBridge`]: C function pointers from a host integration layer
//! - `PythonBridge` (feature `python`): CPython `Py_IncRef`/`Py_DecRef`
//!
//! Every adapter is `Send + Sync`; concurrent calls from columns on
//! different threads are safe.

mod callback;
mod counting;
#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod tests;

pub use callback::{CallbackBridge, HostCallbacks, RefCallback, STATUS_OK};
pub use counting::CountingBridge;
#[cfg(feature = "python")]
pub use python::PythonBridge;

use crate::diagnostics::{BridgeEvent, EventPhase, ReferenceObserver};
use crate::errors::{BridgeError, BridgeOp};
use crate::handle::Handle;
use crate::logging;
use std::sync::Arc;

/// Adapter between a column and the host runtime's reference counting.
///
/// Neither method is ever called with [`Handle::EMPTY`]. An adapter that
/// receives it anyway must return [`BridgeError::InvalidHandle`].
pub trait ReferenceBridge: Send + Sync {
    /// A new owner now holds a reference to `handle`.
    fn acquire(&self, handle: Handle) -> Result<(), BridgeError>;

    /// An owner no longer holds its reference to `handle`.
    fn release(&self, handle: Handle) -> Result<(), BridgeError>;

    /// Short adapter name for log output.
    fn name(&self) -> &'static str {
        "bridge"
    }
}

/// Bridge shared between a column and its snapshots.
pub type SharedBridge = Arc<dyn ReferenceBridge>;

impl<B: ReferenceBridge + ?Sized> ReferenceBridge for Arc<B> {
    #[inline]
    fn acquire(&self, handle: Handle) -> Result<(), BridgeError> {
        (**self).acquire(handle)
    }

    #[inline]
    fn release(&self, handle: Handle) -> Result<(), BridgeError> {
        (**self).release(handle)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Bridge plus the column's diagnostics: every call is logged and
/// forwarded to the observer, if one is attached.
#[derive(Clone)]
pub(crate) struct BridgeLink {
    bridge: SharedBridge,
    observer: Option<Arc<dyn ReferenceObserver>>,
    trace_events: bool,
}

impl BridgeLink {
    pub(crate) fn new(bridge: SharedBridge, trace_events: bool) -> Self {
        Self {
            bridge,
            observer: None,
            trace_events,
        }
    }

    pub(crate) fn bridge(&self) -> &SharedBridge {
        &self.bridge
    }

    pub(crate) fn observer(&self) -> Option<&Arc<dyn ReferenceObserver>> {
        self.observer.as_ref()
    }

    pub(crate) fn set_observer(&mut self, observer: Arc<dyn ReferenceObserver>) {
        self.observer = Some(observer);
    }

    #[inline]
    pub(crate) fn acquire(&self, handle: Handle, phase: EventPhase) -> Result<(), BridgeError> {
        self.call(BridgeOp::Acquire, handle, phase)
    }

    #[inline]
    pub(crate) fn release(&self, handle: Handle, phase: EventPhase) -> Result<(), BridgeError> {
        self.call(BridgeOp::Release, handle, phase)
    }

    fn call(&self, op: BridgeOp, handle: Handle, phase: EventPhase) -> Result<(), BridgeError> {
        debug_assert!(!handle.is_empty(), "empty handle reached the bridge");

        let outcome = match op {
            BridgeOp::Acquire => self.bridge.acquire(handle),
            BridgeOp::Release => self.bridge.release(handle),
        };

        if self.trace_events {
            logging::log_bridge_call(self.bridge.name(), op, handle);
        }
        if let Err(err) = &outcome {
            logging::log_bridge_failure(self.bridge.name(), op, handle, err);
        }

        if let Some(observer) = &self.observer {
            observer.record(&BridgeEvent {
                kind: op,
                handle,
                outcome,
                phase,
            });
        }

        outcome
    }
}
