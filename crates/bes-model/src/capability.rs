//! Capability traits implemented by simulation models.
//!
//! A model always implements [`Model`] (identity, published results, restart state).
//! It may additionally offer:
//! - [`TimeDependency`]: cached, externally driven values refreshed by `set_time`, and
//!   the `step_completed` hook (the only point where persistent state may change)
//! - [`StateDependency`]: results computed from other models' results by `update`
//!
//! The engine asks for a capability through the `as_*` accessors instead of downcasting.

use bes_core::{
    InputReference, ObjectId, QuantityDescription, ReferenceType, ResultKey, ValueRange, ValueRef,
};

use crate::error::{ModelResult, UpdateError};
use crate::store::ValueStore;

/// Where a model's published keys are searched during input resolution.
///
/// Stages are consulted in declaration order; the first stage knowing a key wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LookupStage {
    /// Externally supplied values overriding regular results (co-simulation inputs).
    Override,
    Regular,
    /// Schedule values defined for whole object lists.
    Schedule,
}

/// A resolved input: where to read it and whether it can ever change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedInput {
    pub range: ValueRange,
    pub constant: bool,
}

impl ResolvedInput {
    /// Scalar inputs read their first element.
    pub fn value(&self, store: &ValueStore) -> f64 {
        store.get(self.range.start)
    }

    pub fn sum(&self, store: &ValueStore) -> f64 {
        store.sum(self.range)
    }
}

pub trait Model: Send {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Model
    }

    fn id(&self) -> ObjectId;

    fn display_name(&self) -> &str;

    /// Short type keyword used in diagnostics, e.g. `NaturalVentilationModel`.
    fn model_type(&self) -> &'static str;

    /// Metadata of all published results. Must not change after construction.
    fn result_descriptions(&self) -> Vec<QuantityDescription>;

    /// Receive one slot range per result description, in the same order. Called once.
    fn bind_results(&mut self, slots: Vec<ValueRange>);

    /// Write initial values (constants, initial states) after slots are bound.
    fn write_initial_results(&self, _store: &ValueStore) {}

    fn lookup_stage(&self) -> LookupStage {
        LookupStage::Regular
    }

    /// Keys under which results are found by other models, with the description index.
    ///
    /// Defaults to the model's own reference type and id for every description.
    fn published_keys(&self) -> Vec<(ResultKey, usize)> {
        self.result_descriptions()
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                (
                    ResultKey {
                        reference_type: self.reference_type(),
                        id: self.id(),
                        name: d.name,
                    },
                    i,
                )
            })
            .collect()
    }

    fn serialization_size(&self) -> usize {
        0
    }

    /// Append exactly `serialization_size()` bytes of persistent state.
    fn serialize(&self, _buf: &mut Vec<u8>) {}

    fn deserialize(&mut self, _buf: &[u8]) -> ModelResult<()> {
        Ok(())
    }

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        None
    }

    fn as_state_dependency(&self) -> Option<&dyn StateDependency> {
        None
    }

    fn as_state_dependency_mut(&mut self) -> Option<&mut dyn StateDependency> {
        None
    }
}

pub trait TimeDependency {
    /// Refresh time-driven results for time `t` (seconds since start).
    ///
    /// Must not read results of other models.
    fn set_time(&mut self, t: f64, store: &ValueStore) -> Result<(), UpdateError>;

    /// The step ending at `t` was accepted by the integrator.
    fn step_completed(&mut self, _t: f64) {}
}

/// "`result` is a direct function of `input`".
pub type DependencyPair = (ValueRef, ValueRef);

pub trait StateDependency {
    /// Declared inputs. Resolved values are handed back in the same order.
    fn input_references(&self) -> Vec<InputReference>;

    /// Resolved inputs, positionally matching `input_references()`.
    /// `None` marks an optional input without producer.
    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()>;

    /// Explicit result/input pairs. `None` (the default) lets the engine derive them:
    /// every result depends on every resolved non-constant input.
    fn state_dependencies(&self) -> Option<Vec<DependencyPair>> {
        None
    }

    /// Explicit ordering hint; values at or above
    /// [`bes_graph::PRIORITY_OFFSET_TAIL`] are evaluated after all regular models.
    fn priority_of_model_evaluation(&self) -> Option<u32> {
        None
    }

    /// Recompute all results from the current input values.
    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError>;
}
