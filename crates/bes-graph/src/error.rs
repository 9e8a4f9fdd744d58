//! Graph-specific error types.

use bes_core::{NodeIdx, ValueRef};

/// Dependency graph construction errors.
///
/// All of these are configuration errors: they are detected once at setup and never
/// during a running step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The same node index was registered twice.
    DuplicateNode { node: NodeIdx },

    /// Two nodes claim the same result slot.
    SlotOwnedTwice {
        slot: ValueRef,
        first: NodeIdx,
        second: NodeIdx,
    },

    /// A dependency edge names a result slot that no registered node owns.
    UnownedResult { slot: ValueRef, input: ValueRef },

    /// A node declares a dependency for a result slot owned by another node.
    ForeignResult {
        node: NodeIdx,
        slot: ValueRef,
        owner: NodeIdx,
    },

    /// Topological sorting failed on a graph that should be acyclic after condensation.
    Inconsistent { what: &'static str },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::DuplicateNode { node } => {
                write!(f, "Node {} registered twice in dependency graph", node)
            }
            GraphError::SlotOwnedTwice {
                slot,
                first,
                second,
            } => {
                write!(
                    f,
                    "Result slot {} is owned by node {} and node {}",
                    slot, first, second
                )
            }
            GraphError::UnownedResult { slot, input } => {
                write!(
                    f,
                    "Dependency edge ({} <- {}) refers to a result slot owned by no node",
                    slot, input
                )
            }
            GraphError::ForeignResult { node, slot, owner } => {
                write!(
                    f,
                    "Node {} declares a dependency for result slot {} owned by node {}",
                    node, slot, owner
                )
            }
            GraphError::Inconsistent { what } => {
                write!(f, "Dependency graph inconsistent: {}", what)
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = Result<T, GraphError>;
