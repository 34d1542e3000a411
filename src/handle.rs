//! Opaque handles to host-runtime objects
//!
//! A handle is an address-sized identifier the column stores without
//! interpreting. Only the host runtime knows whether a handle is live.

use std::fmt;

/// Opaque reference to an object owned by the host runtime.
///
/// There is deliberately no `From<u64>` or arithmetic: a handle is built
/// from an address with [`Handle::from_raw`] and compared for equality only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The "no object" sentinel. Never reaches a bridge.
    pub const EMPTY: Handle = Handle(0);

    /// Wrap a host address. Zero yields [`Handle::EMPTY`].
    #[inline]
    pub const fn from_raw(address: u64) -> Self {
        Self(address)
    }

    /// Wrap a host pointer.
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u64)
    }

    /// Raw address, for handing back to the host runtime.
    #[inline]
    pub const fn into_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `None` for the empty sentinel.
    #[inline]
    pub const fn non_empty(self) -> Option<Handle> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Handle(empty)")
        } else {
            write!(f, "Handle({:#x})", self.0)
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sentinel() {
        assert!(Handle::EMPTY.is_empty());
        assert!(Handle::from_raw(0).is_empty());
        assert_eq!(Handle::default(), Handle::EMPTY);
        assert_eq!(Handle::EMPTY.non_empty(), None);
    }

    #[test]
    fn test_raw_roundtrip_and_format() {
        let h = Handle::from_raw(0xAA);
        assert!(!h.is_empty());
        assert_eq!(h.into_raw(), 0xAA);
        assert_eq!(h.non_empty(), Some(h));
        assert_eq!(format!("{:?}", h), "Handle(0xaa)");
        assert_eq!(h.to_string(), "0xaa");
        assert_eq!(format!("{:?}", Handle::EMPTY), "Handle(empty)");
    }

    #[test]
    fn test_from_ptr() {
        let value = 7u32;
        let h = Handle::from_ptr(&value as *const u32);
        assert_eq!(h.into_raw(), &value as *const u32 as usize as u64);
        assert!(Handle::from_ptr(std::ptr::null::<u8>()).is_empty());
    }
}
