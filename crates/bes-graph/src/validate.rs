//! Structural checks run before scheduling.

use std::collections::{HashMap, HashSet};

use bes_core::{NodeIdx, ValueRef};

use crate::builder::{DependencyEdge, NodeSpec};
use crate::error::{GraphError, GraphResult};

/// Verify node uniqueness and slot ownership, returning the slot -> owner map.
pub(crate) fn validate_structure(
    nodes: &[NodeSpec],
    edges: &[DependencyEdge],
) -> GraphResult<HashMap<ValueRef, NodeIdx>> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.idx) {
            return Err(GraphError::DuplicateNode { node: node.idx });
        }
    }

    let mut owner: HashMap<ValueRef, NodeIdx> = HashMap::new();
    for node in nodes {
        for range in &node.results {
            for slot in range.iter() {
                if let Some(&first) = owner.get(&slot) {
                    return Err(GraphError::SlotOwnedTwice {
                        slot,
                        first,
                        second: node.idx,
                    });
                }
                owner.insert(slot, node.idx);
            }
        }
    }

    // A node may only declare dependencies for its own results
    for edge in edges {
        match owner.get(&edge.result) {
            None => {
                return Err(GraphError::UnownedResult {
                    slot: edge.result,
                    input: edge.input,
                });
            }
            Some(&o) if o != edge.node => {
                return Err(GraphError::ForeignResult {
                    node: edge.node,
                    slot: edge.result,
                    owner: o,
                });
            }
            Some(_) => {}
        }
    }

    Ok(owner)
}
