//! Engine-side wrapper of one registered model.

use bes_core::{InputReference, NodeIdx, QuantityDescription, ValueRange};

use crate::capability::{DependencyPair, Model, ResolvedInput};
use crate::error::EvalError;
use crate::store::ValueStore;

pub(crate) struct ModelNode {
    pub idx: NodeIdx,
    /// Diagnostic name, e.g. `NaturalVentilationModel #5 'Ventilation'`.
    pub name: String,
    pub model: Box<dyn Model>,
    pub results: Vec<(QuantityDescription, ValueRange)>,
    pub inputs: Vec<InputReference>,
    pub resolved: Vec<Option<ResolvedInput>>,
    pub edges: Vec<DependencyPair>,
}

impl ModelNode {
    pub fn new(idx: NodeIdx, model: Box<dyn Model>) -> Self {
        let name = format!(
            "{} #{} '{}'",
            model.model_type(),
            model.id(),
            model.display_name()
        );
        Self {
            idx,
            name,
            model,
            results: Vec::new(),
            inputs: Vec::new(),
            resolved: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn result_ranges(&self) -> Vec<ValueRange> {
        self.results.iter().map(|(_, r)| *r).collect()
    }

    pub fn is_state_dependent(&self) -> bool {
        self.model.as_state_dependency().is_some()
    }

    pub fn update(&mut self, store: &ValueStore) -> Result<(), EvalError> {
        match self.model.as_state_dependency_mut() {
            Some(sd) => sd
                .update(store)
                .map_err(|e| EvalError::from_update(&self.name, e)),
            None => Ok(()),
        }
    }
}
