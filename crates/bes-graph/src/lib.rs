//! bes-graph: dependency graph and evaluation schedule for state-dependent models.
//!
//! Provides:
//! - Slot-level dependency graph builder with ownership validation
//! - Cycle detection (Tarjan SCC) separating true value cycles from node-level ones
//! - Deterministic topological ordering with priority tiers and parallel levels
//!
//! # Example
//!
//! ```
//! use bes_core::{NodeIdx, ValueRange, ValueRef};
//! use bes_graph::{DependencyGraphBuilder, GroupKind};
//!
//! let slot = ValueRef::from_index;
//! let mut builder = DependencyGraphBuilder::new();
//! builder.add_node(NodeIdx(0), "summation", None, vec![ValueRange::scalar(slot(0))]);
//! builder.add_node(NodeIdx(1), "ventilation", None, vec![ValueRange::scalar(slot(1))]);
//! builder.add_edge(NodeIdx(0), slot(0), slot(1));
//! let schedule = builder.build().unwrap();
//!
//! assert_eq!(schedule.flat_order(), vec![NodeIdx(1), NodeIdx(0)]);
//! assert!(schedule.groups.iter().all(|g| g.kind == GroupKind::Single));
//! ```

pub mod builder;
pub mod error;
pub mod schedule;
pub(crate) mod validate;

pub use builder::{DependencyEdge, DependencyGraphBuilder, NodeSpec};
pub use error::{GraphError, GraphResult};
pub use schedule::{EvaluationGroup, GroupKind, PRIORITY_OFFSET_TAIL, Schedule, Tier};
