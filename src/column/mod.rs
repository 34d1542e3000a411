//! Object column - cells holding foreign-object handles
//!
//! Every cell that holds a handle owns exactly one reference acquired
//! through the column's bridge. The cell state machine:
//!
//! ```text
//! Empty      --set(h)-->          acquire(h)            Holding(h)
//! Holding(h) --set(h')-->         release(h) acquire(h') Holding(h')
//! Holding(h) --set(empty)-->      release(h)            Empty
//! Holding(h) --destroy/shrink-->  release(h)            Gone
//! Empty      --destroy/shrink-->                        Gone
//! ```
//!
//! Empty transitions never reach the bridge. Self-assignment still
//! costs one acquire and one release, taken in that order so the object
//! stays alive when the column is its last owner.

mod validity;


use crate::bridge::{BridgeLink, ReferenceBridge, SharedBridge};
use crate::config::ColumnConfig;
use crate::diagnostics::{EventPhase, ReferenceObserver};
use crate::errors::{BridgeOp, ReferenceError, Result};
use crate::handle::Handle;
use crate::logging::{self, perf};
use bitvec::prelude::{BitSlice, Lsb0};
use std::fmt;
use std::sync::Arc;
use validity::Validity;

/// Outcome of [`ObjectColumn::destroy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// References released successfully.
    pub released: usize,
    /// References the bridge refused to release; leaked on the host side.
    pub failed: usize,
}

impl TeardownReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Resizable column of foreign-object handles.
///
/// Not internally synchronized: mutation takes `&mut self`. The column is
/// `Send + Sync` because its bridge and observer are.
pub struct ObjectColumn {
    cells: Vec<Handle>,
    validity: Validity,
    link: BridgeLink,
    config: ColumnConfig,
    destroyed: bool,
}

impl ObjectColumn {
    pub fn new(bridge: SharedBridge) -> Self {
        Self::with_config(ColumnConfig::default(), bridge)
    }

    pub fn with_config(config: ColumnConfig, bridge: SharedBridge) -> Self {
        Self {
            cells: Vec::with_capacity(config.initial_capacity),
            validity: Validity::with_capacity(config.initial_capacity),
            link: BridgeLink::new(bridge, config.trace_events),
            config,
            destroyed: false,
        }
    }

    /// Column of `len` empty cells.
    pub fn with_len(len: usize, bridge: SharedBridge) -> Self {
        let mut column = Self::new(bridge);
        column.cells.resize(len, Handle::EMPTY);
        column.validity.resize(len);
        column
    }

    /// Attach an observer that sees every bridge call this column makes.
    pub fn with_observer(mut self, observer: Arc<dyn ReferenceObserver>) -> Self {
        self.link.set_observer(observer);
        self
    }

    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    pub fn bridge(&self) -> &SharedBridge {
        self.link.bridge()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Handle held by cell `index`; `None` if the cell is empty or out of
    /// bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Handle> {
        if self.validity.get(index) {
            Some(self.cells[index])
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.validity.get(index)
    }

    /// Number of cells currently holding a reference.
    pub fn held_count(&self) -> usize {
        self.validity.count()
    }

    /// Validity bitmap, one bit per cell.
    pub fn validity(&self) -> &BitSlice<usize, Lsb0> {
        self.validity.as_bitslice()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Handle>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Write `handle` into cell `index`, releasing whatever it held.
    ///
    /// On error the cell keeps its previous value. The one exception is an
    /// overwrite whose new handle is rejected and whose old handle can then
    /// not be re-acquired: the old reference is gone, so the cell is left
    /// empty and the rollback failure is logged.
    pub fn set(&mut self, index: usize, handle: Handle) -> Result<()> {
        self.ensure_live()?;
        self.check_index(index)?;

        let previous = self.get(index);
        if previous.is_some() && previous == handle.non_empty() {
            return self.cycle(index, handle);
        }
        if let Some(old) = previous {
            self.link
                .release(old, EventPhase::Mutation)
                .map_err(|err| ReferenceError::bridge(BridgeOp::Release, index, err))?;
            self.store(index, Handle::EMPTY);
        }

        let Some(new) = handle.non_empty() else {
            return Ok(());
        };

        if let Err(err) = self.link.acquire(new, EventPhase::Mutation) {
            if let Some(old) = previous {
                self.rollback(index, old);
            }
            return Err(ReferenceError::bridge(BridgeOp::Acquire, index, err));
        }

        self.store(index, new);
        Ok(())
    }

    /// Empty cell `index`.
    #[inline]
    pub fn clear(&mut self, index: usize) -> Result<()> {
        self.set(index, Handle::EMPTY)
    }

    /// Append one cell.
    pub fn push(&mut self, handle: Handle) -> Result<()> {
        self.ensure_live()?;

        if !handle.is_empty() {
            let index = self.len();
            self.link
                .acquire(handle, EventPhase::Mutation)
                .map_err(|err| ReferenceError::bridge(BridgeOp::Acquire, index, err))?;
        }

        self.cells.push(handle);
        self.validity.push(!handle.is_empty());
        Ok(())
    }

    /// Append cells in order. Stops at the first failure; cells appended
    /// before it stay in the column.
    pub fn extend<I>(&mut self, handles: I) -> Result<()>
    where
        I: IntoIterator<Item = Handle>,
    {
        let handles = handles.into_iter();
        let (lower, _) = handles.size_hint();
        self.cells.reserve(lower);

        for handle in handles {
            self.push(handle)?;
        }
        Ok(())
    }

    /// Grow with empty cells or shrink, releasing removed cells.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        self.ensure_live()?;

        if new_len < self.len() {
            return self.truncate(new_len);
        }
        self.cells.resize(new_len, Handle::EMPTY);
        self.validity.resize(new_len);
        Ok(())
    }

    /// Shrink to `len` cells, releasing from the end. If a release fails,
    /// the failing cell and everything before it remain.
    pub fn truncate(&mut self, len: usize) -> Result<()> {
        self.ensure_live()?;

        while self.len() > len {
            let index = self.len() - 1;
            if let Some(handle) = self.get(index) {
                self.link
                    .release(handle, EventPhase::Mutation)
                    .map_err(|err| ReferenceError::bridge(BridgeOp::Release, index, err))?;
            }
            self.cells.truncate(index);
            self.validity.resize(index);
        }
        Ok(())
    }

    /// Empty every cell, keeping the length.
    pub fn clear_all(&mut self) -> Result<()> {
        self.ensure_live()?;

        for index in 0..self.len() {
            self.clear(index)?;
        }
        Ok(())
    }

    /// Release every cell and drop them all.
    #[inline]
    pub fn reset(&mut self) -> Result<()> {
        self.truncate(0)
    }

    /// Make `destination` an independent copy of this column.
    ///
    /// `destination` is resized to this column's length and every cell is
    /// `set` to the source value, so each held handle gains one reference
    /// acquired through the destination's bridge. Source cells are never
    /// touched. Stops at the first failing cell; earlier cells stay copied.
    pub fn copy_into(&self, destination: &mut ObjectColumn) -> Result<()> {
        self.ensure_live()?;
        destination.ensure_live()?;
        let _guard = perf::track("copy_into");

        destination.resize(self.len())?;
        for (index, cell) in self.iter().enumerate() {
            destination.set(index, cell.unwrap_or(Handle::EMPTY))?;
        }
        Ok(())
    }

    /// New column on the same bridge and observer holding the same handles.
    pub fn snapshot(&self) -> Result<ObjectColumn> {
        let mut copy = ObjectColumn::with_config(self.config.clone(), self.link.bridge().clone());
        if let Some(observer) = self.link.observer() {
            copy.link.set_observer(observer.clone());
        }
        self.copy_into(&mut copy)?;
        Ok(copy)
    }

    /// Release every held cell once and free the storage.
    ///
    /// Bridge failures are logged and reported to the observer, never
    /// returned; storage is freed regardless. Calling again is a no-op.
    pub fn destroy(&mut self) -> TeardownReport {
        if self.destroyed {
            return TeardownReport::default();
        }

        let mut report = TeardownReport::default();
        for index in self.validity.iter_held() {
            match self.link.release(self.cells[index], EventPhase::Teardown) {
                Ok(()) => report.released += 1,
                Err(_) => report.failed += 1,
            }
        }

        self.cells = Vec::new();
        self.validity.free();
        self.destroyed = true;

        logging::log_teardown(report.released, report.failed);
        if report.failed > 0 && report.failed >= self.config.teardown_warn_threshold {
            logging::log_teardown_failure(report.failed, self.config.teardown_warn_threshold);
        }
        report
    }

    #[inline]
    fn store(&mut self, index: usize, handle: Handle) {
        self.cells[index] = handle;
        self.validity.set(index, !handle.is_empty());
    }

    /// Self-assignment: the new reference is taken before the old one is
    /// dropped, so a column that is the object's last owner never lets the
    /// host count reach zero mid-transition.
    fn cycle(&mut self, index: usize, handle: Handle) -> Result<()> {
        self.link
            .acquire(handle, EventPhase::Mutation)
            .map_err(|err| ReferenceError::bridge(BridgeOp::Acquire, index, err))?;

        if let Err(err) = self.link.release(handle, EventPhase::Mutation) {
            // The cell still holds one reference; hand back the extra one.
            if let Err(undo) = self.link.release(handle, EventPhase::Rollback) {
                logging::log_extra_reference(index, handle, &undo);
            }
            return Err(ReferenceError::bridge(BridgeOp::Release, index, err));
        }
        Ok(())
    }

    fn rollback(&mut self, index: usize, old: Handle) {
        match self.link.acquire(old, EventPhase::Rollback) {
            Ok(()) => self.store(index, old),
            Err(err) => logging::log_rollback_failure(index, old, &err),
        }
    }

    #[inline]
    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            Err(ReferenceError::Destroyed)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(ReferenceError::OutOfBounds { index, len: self.len() })
        }
    }
}

impl Drop for ObjectColumn {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for ObjectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectColumn")
            .field("bridge", &self.link.bridge().name())
            .field("len", &self.len())
            .field("held", &self.held_count())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
