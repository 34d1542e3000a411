//! objref-column - columns of host-runtime object references
//!
//! A columnar store keeps foreign objects as opaque [`Handle`]s. The
//! host runtime (CPython, a C runtime, ...) owns the objects and their
//! reference counts; an [`ObjectColumn`] owns exactly one reference per
//! non-empty cell and routes every acquire and release through an
//! injected [`ReferenceBridge`].
//!
//! ```
//! use objref_column::{CountingBridge, Handle, ObjectColumn};
//! use std::sync::Arc;
//!
//! let host = Arc::new(CountingBridge::new());
//! let obj = Handle::from_raw(0xAA);
//! host.register(obj);
//!
//! let mut column = ObjectColumn::with_len(3, host.clone());
//! column.set(0, obj).unwrap();
//! assert_eq!(host.refcount(obj), 2);
//!
//! column.destroy();
//! assert_eq!(host.refcount(obj), 1);
//! ```

pub mod bridge;
pub mod column;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod handle;
pub mod logging;

// Re-export commonly used items
pub use bridge::{CallbackBridge, CountingBridge, HostCallbacks, ReferenceBridge, SharedBridge};
#[cfg(feature = "python")]
pub use bridge::PythonBridge;
pub use column::{ObjectColumn, TeardownReport};
pub use config::ColumnConfig;
pub use diagnostics::{BridgeEvent, EventCounters, EventLog, EventPhase, ReferenceObserver};
pub use errors::{BridgeError, BridgeOp, ConfigError, ReferenceError};
pub use handle::Handle;

/// Install logging from the environment. Safe to call more than once.
pub fn init() {
    logging::init();
    logging::log_runtime_init();
}

/// C entry point for host integration layers
#[no_mangle]
pub extern "C" fn objref_column_init() {
    init();
}
