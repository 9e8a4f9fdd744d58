//! Evaluation of one scheduled group.

use bes_core::ValueRange;
use bes_graph::{EvaluationGroup, GroupKind};

use crate::config::GroupSolverConfig;
use crate::error::EvalError;
use crate::node::ModelNode;
use crate::store::ValueStore;

/// Evaluate a group. `members` must be ordered like `group.members`.
///
/// Returns the number of fixed-point iterations spent (0 for non-cyclic groups).
pub(crate) fn evaluate_group(
    group: &EvaluationGroup,
    members: &mut [&mut ModelNode],
    store: &ValueStore,
    config: &GroupSolverConfig,
) -> Result<usize, EvalError> {
    match group.kind {
        GroupKind::Single => {
            for m in members.iter_mut() {
                m.update(store)?;
            }
            Ok(0)
        }
        GroupKind::Sequential => {
            for node in &group.sequence {
                let m = members
                    .iter_mut()
                    .find(|m| m.idx == *node)
                    .ok_or(EvalError::Lifecycle {
                        what: "sequence names a node outside its group",
                    })?;
                m.update(store)?;
            }
            Ok(0)
        }
        GroupKind::Cyclic => solve_fixed_point(members, store, config),
    }
}

/// Gauss-Seidel iteration over the members until no result slot changes beyond tolerance.
fn solve_fixed_point(
    members: &mut [&mut ModelNode],
    store: &ValueStore,
    config: &GroupSolverConfig,
) -> Result<usize, EvalError> {
    let ranges: Vec<ValueRange> = members.iter().flat_map(|m| m.result_ranges()).collect();
    let mut old = store.snapshot(&ranges);
    let mut max_change = f64::INFINITY;

    for iteration in 1..=config.max_iterations {
        for m in members.iter_mut() {
            m.update(store)?;
        }
        let new = store.snapshot(&ranges);
        let mut converged = true;
        max_change = 0.0;
        for (o, n) in old.iter().zip(&new) {
            let change = (n - o).abs();
            // NaN sticks; `f64::max` would drop it
            max_change = if change.is_nan() || max_change.is_nan() {
                f64::NAN
            } else {
                max_change.max(change)
            };
            if !config.tolerances.converged(*o, *n) {
                converged = false;
            }
        }
        tracing::trace!(iteration, max_change, "implicit group iteration");
        if converged {
            return Ok(iteration);
        }
        old = new;
    }

    Err(EvalError::NotConverged {
        members: members.iter().map(|m| m.name.clone()).collect(),
        iterations: config.max_iterations,
        max_change,
    })
}
