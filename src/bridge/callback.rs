//! C callback adapter - host runtimes that expose incref/decref as C functions
//!
//! The host integration layer hands over a pair of function pointers at
//! startup. A status of [`STATUS_OK`] means the call succeeded; anything
//! else means the host did not recognize the address.

use super::ReferenceBridge;
use crate::errors::BridgeError;
use crate::handle::Handle;

/// Status a host callback returns on success.
pub const STATUS_OK: i32 = 0;

/// Host-side reference operation on a raw object address.
pub type RefCallback = unsafe extern "C" fn(address: u64) -> i32;

/// Callback table supplied by the host integration layer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCallbacks {
    pub incref: Option<RefCallback>,
    pub decref: Option<RefCallback>,
}

/// Bridge over [`HostCallbacks`].
///
/// Thread-safety is whatever the host callbacks provide; see
/// [`CallbackBridge::new`].
#[derive(Debug, Clone, Copy)]
pub struct CallbackBridge {
    callbacks: HostCallbacks,
}

impl CallbackBridge {
    /// # Safety
    /// - Both callbacks, when present, must remain callable for the
    ///   lifetime of every column using this bridge
    /// - They must be safe to call concurrently from any thread
    /// - They must tolerate any non-zero address, reporting unknown
    ///   ones through a non-zero status rather than dereferencing them
    pub const unsafe fn new(callbacks: HostCallbacks) -> Self {
        Self { callbacks }
    }

    pub fn is_connected(&self) -> bool {
        self.callbacks.incref.is_some() && self.callbacks.decref.is_some()
    }

    #[inline]
    fn invoke(callback: Option<RefCallback>, handle: Handle) -> Result<(), BridgeError> {
        let callback = callback.ok_or(BridgeError::Unavailable)?;
        if handle.is_empty() {
            return Err(BridgeError::InvalidHandle { handle });
        }

        // Safety: upheld by the contract of `CallbackBridge::new`.
        let status = unsafe { callback(handle.into_raw()) };
        if status == STATUS_OK {
            Ok(())
        } else {
            Err(BridgeError::InvalidHandle { handle })
        }
    }
}

impl ReferenceBridge for CallbackBridge {
    fn acquire(&self, handle: Handle) -> Result<(), BridgeError> {
        Self::invoke(self.callbacks.incref, handle)
    }

    fn release(&self, handle: Handle) -> Result<(), BridgeError> {
        Self::invoke(self.callbacks.decref, handle)
    }

    fn name(&self) -> &'static str {
        "callback"
    }
}
