//! Ideal (unlimited response time) heating and cooling driven by thermostat signals.

use bes_core::{
    IndexKeyType, InputReference, ObjectId, QuantityDescription, QuantityName, ReferenceType,
    ValueRange,
};

use crate::capability::{DependencyPair, Model, ResolvedInput, StateDependency};
use crate::error::{ModelError, ModelResult, UpdateError};
use crate::store::ValueStore;

/// Publishes `IdealHeatingLoad` and `IdealCoolingLoad` [W] per zone.
///
/// Loads are the maximum power scaled by the thermostat control value of the zone,
/// clamped to `[0, 1]`.
#[derive(Debug)]
pub struct IdealHeatingCoolingModel {
    id: ObjectId,
    name: String,
    zone_ids: Vec<ObjectId>,
    thermostat_id: ObjectId,
    max_heating_power: f64,
    max_cooling_power: f64,
    /// (heating, cooling) control value per zone.
    controls: Vec<(ResolvedInput, ResolvedInput)>,
    slots: Vec<ValueRange>,
}

impl IdealHeatingCoolingModel {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        zone_ids: Vec<ObjectId>,
        thermostat_id: ObjectId,
        max_heating_power: f64,
        max_cooling_power: f64,
    ) -> ModelResult<Self> {
        let name = name.into();
        if !(max_heating_power >= 0.0) || !(max_cooling_power >= 0.0) {
            return Err(ModelError::invalid(
                &name,
                "maximum heating/cooling power must be >= 0",
            ));
        }
        Ok(Self {
            id,
            name,
            zone_ids,
            thermostat_id,
            max_heating_power,
            max_cooling_power,
            controls: Vec::new(),
            slots: Vec::new(),
        })
    }
}

impl Model for IdealHeatingCoolingModel {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "IdealHeatingCoolingModel"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        let vector = |name: &str, description: &str| {
            QuantityDescription::vector(
                name,
                "W",
                description,
                false,
                IndexKeyType::ObjectId,
                self.zone_ids.clone(),
            )
        };
        vec![
            vector("IdealHeatingLoad", "Ideal heating load"),
            vector("IdealCoolingLoad", "Ideal cooling load"),
        ]
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slots = slots;
    }

    fn as_state_dependency(&self) -> Option<&dyn StateDependency> {
        Some(self)
    }

    fn as_state_dependency_mut(&mut self) -> Option<&mut dyn StateDependency> {
        Some(self)
    }
}

impl StateDependency for IdealHeatingCoolingModel {
    fn input_references(&self) -> Vec<InputReference> {
        self.zone_ids
            .iter()
            .flat_map(|z| {
                ["HeatingControlValue", "CoolingControlValue"].map(|q| {
                    InputReference::required(
                        ReferenceType::Model,
                        self.thermostat_id,
                        QuantityName::indexed(q, *z),
                    )
                })
            })
            .collect()
    }

    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()> {
        let missing = || ModelError::invalid(&self.name, "required input was not resolved");
        let mut controls = Vec::with_capacity(self.zone_ids.len());
        for pair in inputs.chunks(2) {
            let heating = pair.first().copied().flatten().ok_or_else(missing)?;
            let cooling = pair.get(1).copied().flatten().ok_or_else(missing)?;
            controls.push((heating, cooling));
        }
        if controls.len() != self.zone_ids.len() {
            return Err(missing());
        }
        self.controls = controls;
        Ok(())
    }

    fn state_dependencies(&self) -> Option<Vec<DependencyPair>> {
        let [heating, cooling] = self.slots.as_slice() else {
            return Some(Vec::new());
        };
        let mut pairs = Vec::new();
        for (i, (h, c)) in self.controls.iter().enumerate() {
            if let (Some(hs), Some(cs)) = (heating.get(i as u32), cooling.get(i as u32)) {
                pairs.push((hs, h.range.start));
                pairs.push((cs, c.range.start));
            }
        }
        Some(pairs)
    }

    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError> {
        let [heating, cooling] = self.slots.as_slice() else {
            return Err(UpdateError::fatal("model was not initialized"));
        };
        for (i, (h, c)) in self.controls.iter().enumerate() {
            let i = i as u32;
            if let Some(slot) = heating.get(i) {
                store.set(slot, self.max_heating_power * h.value(store).clamp(0.0, 1.0));
            }
            if let Some(slot) = cooling.get(i) {
                store.set(slot, self.max_cooling_power * c.value(store).clamp(0.0, 1.0));
            }
        }
        Ok(())
    }
}
