use core::fmt;
use core::num::NonZeroU32;

/// Compact handle to one scalar slot in the value arena.
///
/// - `u32` keeps dependency edge lists small
/// - `NonZero` lets `Option<ValueRef>` (an unresolved optional input) cost nothing extra
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef(NonZeroU32);

impl ValueRef {
    /// Create a handle from a 0-based slot index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        // saturating add keeps the value nonzero; u32::MAX slots cannot be allocated anyway
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based slot index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Handle to the slot `offset` positions after this one.
    pub fn offset(self, offset: u32) -> Self {
        Self::from_index(self.index() + offset)
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueRef({})", self.index())
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

/// Contiguous run of slots holding a scalar (`len == 1`) or a vector-valued quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueRange {
    pub start: ValueRef,
    pub len: u32,
}

impl ValueRange {
    pub fn scalar(start: ValueRef) -> Self {
        Self { start, len: 1 }
    }

    pub fn new(start: ValueRef, len: u32) -> Self {
        Self { start, len }
    }

    /// Handle of element `i`, or `None` past the end.
    pub fn get(&self, i: u32) -> Option<ValueRef> {
        (i < self.len).then(|| self.start.offset(i))
    }

    pub fn iter(self) -> impl Iterator<Item = ValueRef> {
        (0..self.len).map(move |i| self.start.offset(i))
    }

    pub fn contains(&self, r: ValueRef) -> bool {
        let i = r.index();
        i >= self.start.index() && i < self.start.index() + self.len
    }
}

/// Position of a model in the simulation's registration order.
///
/// Registration order is the deterministic tie-breaker everywhere in scheduling.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdx({})", self.0)
    }
}

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a physical object (zone, construction, network element...) as given in the project.
///
/// Meaningful only together with a [`crate::ReferenceType`]; Location and Schedule use 0.
pub type ObjectId = u32;
