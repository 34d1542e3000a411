//! Error taxonomy for bridge and column operations

use crate::handle::Handle;
use std::fmt;
use std::io;
use thiserror::Error;

/// Failure reported by a [`ReferenceBridge`](crate::bridge::ReferenceBridge) adapter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The host runtime does not recognize `handle` as a live object (on
    /// acquire), or the handle is not referenced by the caller (on release).
    /// The latter means the column bookkeeping is broken.
    #[error("invalid handle {handle}")]
    InvalidHandle { handle: Handle },

    /// Host runtime integration is not initialized or not reachable.
    #[error("host runtime unavailable")]
    Unavailable,
}

/// Which bridge call a column was making when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeOp {
    Acquire,
    Release,
}

impl fmt::Display for BridgeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire => f.write_str("acquire"),
            Self::Release => f.write_str("release"),
        }
    }
}

/// Error surfaced to callers of [`ObjectColumn`](crate::column::ObjectColumn) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("{op} failed for cell {index}: {source}")]
    Bridge {
        op: BridgeOp,
        index: usize,
        #[source]
        source: BridgeError,
    },

    #[error("cell index {index} out of bounds for column of length {len}")]
    OutOfBounds { index: usize, len: usize },

    #[error("column has been destroyed")]
    Destroyed,
}

impl ReferenceError {
    pub(crate) fn bridge(op: BridgeOp, index: usize, source: BridgeError) -> Self {
        Self::Bridge { op, index, source }
    }

    /// Underlying bridge failure, if this error came from the bridge.
    pub fn bridge_error(&self) -> Option<BridgeError> {
        match self {
            Self::Bridge { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_invalid_handle(&self) -> bool {
        matches!(self.bridge_error(), Some(BridgeError::InvalidHandle { .. }))
    }
}

/// Failure loading a [`ColumnConfig`](crate::config::ColumnConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type Result<T, E = ReferenceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_error_display() {
        let err = ReferenceError::bridge(
            BridgeOp::Acquire,
            2,
            BridgeError::InvalidHandle { handle: Handle::from_raw(0xAB) },
        );
        assert_eq!(err.to_string(), "acquire failed for cell 2: invalid handle 0xab");
        assert!(err.is_invalid_handle());

        let oob = ReferenceError::OutOfBounds { index: 5, len: 3 };
        assert_eq!(oob.to_string(), "cell index 5 out of bounds for column of length 3");
        assert_eq!(oob.bridge_error(), None);
    }

    #[test]
    fn test_unavailable_is_not_invalid_handle() {
        let err = ReferenceError::bridge(BridgeOp::Release, 0, BridgeError::Unavailable);
        assert!(!err.is_invalid_handle());
        assert_eq!(err.bridge_error(), Some(BridgeError::Unavailable));
    }
}
