//! Climatic loads at the building location.

use bes_core::units::{degc, to_kelvin};
use bes_core::{ObjectId, QuantityDescription, ReferenceType, ValueRange};

use crate::capability::{Model, TimeDependency};
use crate::error::UpdateError;
use crate::models::series::TimeSeries;
use crate::store::ValueStore;

/// Publishes the ambient temperature at `Location(id=0)`, interpolated from climate data.
#[derive(Debug)]
pub struct Loads {
    name: String,
    /// Ambient temperature in K.
    temperature: TimeSeries,
    slot: Option<ValueRange>,
}

impl Loads {
    /// `temperature` holds Kelvin values.
    pub fn new(name: impl Into<String>, temperature: TimeSeries) -> Self {
        Self {
            name: name.into(),
            temperature,
            slot: None,
        }
    }

    /// Climate data given in degrees Celsius.
    pub fn from_celsius(name: impl Into<String>, celsius: TimeSeries) -> Self {
        Self::new(name, celsius.map_values(|c| to_kelvin(degc(c))))
    }
}

impl Model for Loads {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Location
    }

    fn id(&self) -> ObjectId {
        0
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "Loads"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        vec![QuantityDescription::scalar(
            "Temperature",
            "K",
            "Outside temperature",
            false,
        )]
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slot = slots.first().copied();
    }

    fn write_initial_results(&self, store: &ValueStore) {
        if let Some(slot) = self.slot {
            store.set(slot.start, self.temperature.value_at(0.0));
        }
    }

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        Some(self)
    }
}

impl TimeDependency for Loads {
    fn set_time(&mut self, t: f64, store: &ValueStore) -> Result<(), UpdateError> {
        if let Some(slot) = self.slot {
            store.set(slot.start, self.temperature.value_at(t));
        }
        Ok(())
    }
}
