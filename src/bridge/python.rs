//! CPython adapter - column references as `Py_IncRef` / `Py_DecRef`
//!
//! Every call takes the GIL. Handles are `PyObject*` addresses; use
//! [`PythonBridge::handle_of`] to build one from a live object.

use super::ReferenceBridge;
use crate::errors::BridgeError;
use crate::handle::Handle;
use pyo3::ffi;
use pyo3::prelude::*;

/// Bridge into the embedding CPython interpreter.
///
/// Thread-safe: refcount changes happen only while holding the GIL.
#[derive(Debug, Clone, Copy)]
pub struct PythonBridge {
    _private: (),
}

impl PythonBridge {
    /// # Safety
    /// Every handle passed to `acquire` must be a live `PyObject*`, and
    /// every handle passed to `release` must carry a reference previously
    /// acquired through this bridge. CPython offers no way to check either.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    /// Handle for an object the caller currently holds.
    pub fn handle_of(obj: &PyAny) -> Handle {
        Handle::from_ptr(obj.as_ptr())
    }

    /// Borrow the object behind a handle a column is holding.
    ///
    /// # Safety
    /// `handle` must currently be held by a column on this bridge, so the
    /// object cannot be reclaimed while the returned reference is alive.
    pub unsafe fn object<'py>(py: Python<'py>, handle: Handle) -> Option<&'py PyAny> {
        let ptr = handle.into_raw() as usize as *mut ffi::PyObject;
        py.from_borrowed_ptr_or_opt(ptr)
    }

    fn object_ptr(handle: Handle) -> Result<*mut ffi::PyObject, BridgeError> {
        if handle.is_empty() {
            return Err(BridgeError::InvalidHandle { handle });
        }
        // Safety: a plain query of interpreter state.
        if unsafe { ffi::Py_IsInitialized() } == 0 {
            return Err(BridgeError::Unavailable);
        }
        Ok(handle.into_raw() as usize as *mut ffi::PyObject)
    }

    fn adjust(handle: Handle, delta: fn(*mut ffi::PyObject)) -> Result<(), BridgeError> {
        let ptr = Self::object_ptr(handle)?;
        Python::with_gil(|_py| delta(ptr));
        Ok(())
    }
}

fn incref(ptr: *mut ffi::PyObject) {
    // Safety: live per the contract of `PythonBridge::new`; GIL held.
    unsafe { ffi::Py_IncRef(ptr) }
}

fn decref(ptr: *mut ffi::PyObject) {
    // Safety: owned reference per the contract of `PythonBridge::new`; GIL held.
    unsafe { ffi::Py_DecRef(ptr) }
}

impl ReferenceBridge for PythonBridge {
    fn acquire(&self, handle: Handle) -> Result<(), BridgeError> {
        Self::adjust(handle, incref)
    }

    fn release(&self, handle: Handle) -> Result<(), BridgeError> {
        Self::adjust(handle, decref)
    }

    fn name(&self) -> &'static str {
        "python"
    }
}
