//! Observability hook for bridge calls
//!
//! Columns report every acquire and release, with its outcome, to an
//! optional [`ReferenceObserver`]. This is the only channel through which
//! teardown failures become visible, since `destroy` never returns an error.

mod recorders;

pub use recorders::{CounterSnapshot, EventCounters, EventLog, ObserverSet};

use crate::errors::{BridgeError, BridgeOp};
use crate::handle::Handle;

/// Lifecycle context a bridge call was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPhase {
    /// `set`, `clear`, `push`, `copy_into`, shrinking.
    Mutation,
    /// Re-acquiring a cell's previous handle after a failed overwrite.
    Rollback,
    /// `destroy` or drop.
    Teardown,
}

/// One bridge call as seen by the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeEvent {
    pub kind: BridgeOp,
    pub handle: Handle,
    pub outcome: Result<(), BridgeError>,
    pub phase: EventPhase,
}

impl BridgeEvent {
    #[inline]
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Receives bridge events from columns. Must be cheap and must not panic;
/// it runs inside column teardown.
pub trait ReferenceObserver: Send + Sync {
    fn record(&self, event: &BridgeEvent);
}
