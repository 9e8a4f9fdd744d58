//! Externally driven values (co-simulation inputs) overriding model results.

use bes_core::{ObjectId, QuantityDescription, ReferenceType, ResultKey, ValueRange};

use crate::capability::{LookupStage, Model, TimeDependency};
use crate::error::UpdateError;
use crate::models::series::TimeSeries;
use crate::store::ValueStore;

#[derive(Clone, Debug)]
pub struct ExternalInput {
    /// The result this input replaces, e.g. `Location(id=0).Temperature`.
    pub target: ResultKey,
    pub unit: String,
    /// Values fed at each `set_time`. `None` leaves the slot to be written by the caller.
    pub series: Option<TimeSeries>,
    pub initial: f64,
}

/// Publishes each input under its target key in the override stage, so every consumer of
/// the target reads the external value instead of the regular producer's.
#[derive(Debug)]
pub struct ExternalInputs {
    inputs: Vec<ExternalInput>,
    slots: Vec<ValueRange>,
}

impl ExternalInputs {
    pub fn new(inputs: Vec<ExternalInput>) -> Self {
        Self {
            inputs,
            slots: Vec::new(),
        }
    }
}

impl Model for ExternalInputs {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Global
    }

    fn id(&self) -> ObjectId {
        0
    }

    fn display_name(&self) -> &str {
        "ExternalInputs"
    }

    fn model_type(&self) -> &'static str {
        "ExternalInputs"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        self.inputs
            .iter()
            .map(|i| {
                QuantityDescription::scalar(
                    i.target.name.as_str(),
                    i.unit.as_str(),
                    format!("External value for {}", i.target),
                    false,
                )
            })
            .collect()
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slots = slots;
    }

    fn write_initial_results(&self, store: &ValueStore) {
        for (input, slot) in self.inputs.iter().zip(&self.slots) {
            store.set(slot.start, input.initial);
        }
    }

    fn lookup_stage(&self) -> LookupStage {
        LookupStage::Override
    }

    fn published_keys(&self) -> Vec<(ResultKey, usize)> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (input.target.clone(), i))
            .collect()
    }

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        Some(self)
    }
}

impl TimeDependency for ExternalInputs {
    fn set_time(&mut self, t: f64, store: &ValueStore) -> Result<(), UpdateError> {
        for (input, slot) in self.inputs.iter().zip(&self.slots) {
            if let Some(series) = &input.series {
                store.set(slot.start, series.value_at(t));
            }
        }
        Ok(())
    }
}
