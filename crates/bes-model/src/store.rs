//! Value arena shared by all models.
//!
//! Every published result occupies a fixed slot range allocated once at initialization.
//! The arena is never reallocated afterwards, so [`ValueRef`] handles stay valid for the
//! lifetime of the simulation. Slots hold `f64` bit patterns in atomics: each slot has a
//! single writer (its owning model) and the schedule orders writers before readers, so
//! relaxed loads and stores suffice and independent groups can run on several threads.

use std::sync::atomic::{AtomicU64, Ordering};

use bes_core::{ValueRange, ValueRef};

#[derive(Debug, Default)]
pub struct ValueStore {
    slots: Box<[AtomicU64]>,
}

impl ValueStore {
    pub fn new(len: usize) -> Self {
        let zero = 0.0_f64.to_bits();
        Self {
            slots: (0..len).map(|_| AtomicU64::new(zero)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read one slot. Handles from another store read as NaN.
    pub fn get(&self, r: ValueRef) -> f64 {
        self.slots
            .get(r.index() as usize)
            .map_or(f64::NAN, |s| f64::from_bits(s.load(Ordering::Relaxed)))
    }

    pub fn set(&self, r: ValueRef, value: f64) {
        if let Some(s) = self.slots.get(r.index() as usize) {
            s.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn read(&self, range: ValueRange) -> impl Iterator<Item = f64> + '_ {
        range.iter().map(move |r| self.get(r))
    }

    /// Sum of all elements of a range; vector inputs are aggregated this way.
    pub fn sum(&self, range: ValueRange) -> f64 {
        self.read(range).sum()
    }

    pub fn write(&self, range: ValueRange, values: &[f64]) {
        for (r, v) in range.iter().zip(values) {
            self.set(r, *v);
        }
    }

    /// Copy out the current values of several ranges, in order.
    pub fn snapshot(&self, ranges: &[ValueRange]) -> Vec<f64> {
        ranges.iter().flat_map(|r| self.read(*r)).collect()
    }
}

/// Hands out contiguous ranges during initialization.
#[derive(Debug, Default)]
pub(crate) struct SlotAllocator {
    next: u32,
}

impl SlotAllocator {
    pub(crate) fn allocate(&mut self, len: u32) -> ValueRange {
        let range = ValueRange::new(ValueRef::from_index(self.next), len);
        self.next += len;
        range
    }

    pub(crate) fn allocated(&self) -> usize {
        self.next as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_reads_back_writes() {
        let mut alloc = SlotAllocator::default();
        let a = alloc.allocate(1);
        let v = alloc.allocate(3);
        let store = ValueStore::new(alloc.allocated());

        store.set(a.start, 21.5);
        store.write(v, &[1.0, 2.0, 3.0]);
        assert_eq!(store.get(a.start), 21.5);
        assert_eq!(store.sum(v), 6.0);
        assert_eq!(store.snapshot(&[v, a]), vec![1.0, 2.0, 3.0, 21.5]);
    }

    #[test]
    fn foreign_handle_reads_nan() {
        let store = ValueStore::new(2);
        assert!(store.get(ValueRef::from_index(7)).is_nan());
    }
}
