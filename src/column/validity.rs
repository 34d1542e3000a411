//! Validity bitmap - one bit per cell, set while the cell holds a handle

use bitvec::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Validity {
    bits: BitVec<usize, Lsb0>,
}

impl Validity {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> bool {
        self.bits.get(index).map_or(false, |bit| *bit)
    }

    #[inline]
    pub(crate) fn set(&mut self, index: usize, valid: bool) {
        self.bits.set(index, valid);
    }

    #[inline]
    pub(crate) fn push(&mut self, valid: bool) {
        self.bits.push(valid);
    }

    pub(crate) fn resize(&mut self, len: usize) {
        self.bits.resize(len, false);
    }

    pub(crate) fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Indices of set bits, lowest first.
    pub(crate) fn iter_held(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    pub(crate) fn as_bitslice(&self) -> &BitSlice<usize, Lsb0> {
        self.bits.as_bitslice()
    }

    /// Drop every bit and give the allocation back.
    pub(crate) fn free(&mut self) {
        self.bits = BitVec::new();
    }
}
