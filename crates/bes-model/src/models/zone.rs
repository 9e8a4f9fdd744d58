//! Thermal zone: air temperature state and constant parameters.

use bes_core::units::{degc, m3, to_kelvin, to_m3};
use bes_core::{ObjectId, QuantityDescription, ReferenceType, ValueRange};

use crate::capability::Model;
use crate::error::{ModelError, ModelResult};
use crate::store::ValueStore;

/// Publishes `Zone(id).AirTemperature` and the constant `Zone(id).Volume`.
///
/// The air temperature is a state of the outer integrator. The engine only allocates the
/// slot and writes the initial value; the integrator writes it through
/// [`crate::Engine::set_value`] before each evaluation.
#[derive(Debug)]
pub struct ZoneModel {
    id: ObjectId,
    name: String,
    volume: f64,
    initial_temperature: f64,
    slots: Vec<ValueRange>,
}

impl ZoneModel {
    /// `volume` in m3, `initial_temperature` in degrees Celsius.
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        volume: f64,
        initial_temperature: f64,
    ) -> ModelResult<Self> {
        let name = name.into();
        if id == 0 {
            return Err(ModelError::invalid(&name, "zone id 0 is reserved"));
        }
        if !(volume > 0.0) {
            return Err(ModelError::invalid(&name, "zone volume must be positive"));
        }
        Ok(Self {
            id,
            name,
            volume: to_m3(m3(volume)),
            initial_temperature: to_kelvin(degc(initial_temperature)),
            slots: Vec::new(),
        })
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

impl Model for ZoneModel {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Zone
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "ZoneModel"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        vec![
            QuantityDescription::scalar("AirTemperature", "K", "Room air temperature", false)
                .with_constraint(173.15, 373.15),
            QuantityDescription::scalar("Volume", "m3", "Net air volume", true),
        ]
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slots = slots;
    }

    fn write_initial_results(&self, store: &ValueStore) {
        if let [temperature, volume] = self.slots.as_slice() {
            store.set(temperature.start, self.initial_temperature);
            store.set(volume.start, self.volume);
        }
    }
}
