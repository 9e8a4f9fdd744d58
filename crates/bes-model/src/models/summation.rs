//! Sum of one quantity over all objects of an object list.

use bes_core::{InputReference, ObjectId, QuantityDescription, QuantityName, ReferenceType, ValueRange};

use crate::capability::{Model, ResolvedInput, StateDependency};
use crate::error::{ModelResult, UpdateError};
use crate::store::ValueStore;

/// Publishes `TotalLoad`, the sum of `quantity` over `object_ids`.
///
/// All inputs are optional: objects that do not publish the quantity contribute nothing,
/// and an empty object list yields 0. Vector-valued inputs are summed over all elements.
/// The sign is inverted for network elements and for zone cooling loads, so that
/// `TotalLoad` is always a heat gain of the receiving side.
#[derive(Debug)]
pub struct HeatLoadSummationModel {
    id: ObjectId,
    name: String,
    reference_type: ReferenceType,
    object_ids: Vec<ObjectId>,
    quantity: QuantityName,
    zone_cooling_load: bool,
    inputs: Vec<Option<ResolvedInput>>,
    slot: Option<ValueRange>,
}

impl HeatLoadSummationModel {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        reference_type: ReferenceType,
        object_ids: Vec<ObjectId>,
        quantity: QuantityName,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            reference_type,
            object_ids,
            quantity,
            zone_cooling_load: false,
            inputs: Vec::new(),
            slot: None,
        }
    }

    pub fn with_zone_cooling_load(mut self, zone_cooling_load: bool) -> Self {
        self.zone_cooling_load = zone_cooling_load;
        self
    }

    fn sign(&self) -> f64 {
        if self.zone_cooling_load || self.reference_type == ReferenceType::NetworkElement {
            -1.0
        } else {
            1.0
        }
    }
}

impl Model for HeatLoadSummationModel {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "HeatLoadSummationModel"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        vec![QuantityDescription::scalar(
            "TotalLoad",
            "W",
            "Sum of heat loads",
            false,
        )]
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slot = slots.first().copied();
    }

    fn as_state_dependency(&self) -> Option<&dyn StateDependency> {
        Some(self)
    }

    fn as_state_dependency_mut(&mut self) -> Option<&mut dyn StateDependency> {
        Some(self)
    }
}

impl StateDependency for HeatLoadSummationModel {
    fn input_references(&self) -> Vec<InputReference> {
        self.object_ids
            .iter()
            .map(|id| InputReference::optional(self.reference_type, *id, self.quantity.clone()))
            .collect()
    }

    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()> {
        let available = inputs.iter().flatten().count();
        if available < inputs.len() {
            tracing::warn!(
                model = %self.name,
                "{} of {} summed objects do not publish {}",
                inputs.len() - available,
                inputs.len(),
                self.quantity
            );
        }
        self.inputs = inputs;
        Ok(())
    }

    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError> {
        let total: f64 = self.inputs.iter().flatten().map(|i| i.sum(store)).sum();
        if let Some(slot) = self.slot {
            store.set(slot.start, self.sign() * total);
        }
        Ok(())
    }
}
