//! Schedule quantities defined for whole object lists.

use bes_core::{ObjectId, QuantityDescription, ReferenceType, ResultKey, ValueRange};

use crate::capability::{LookupStage, Model, TimeDependency};
use crate::error::UpdateError;
use crate::models::series::TimeSeries;
use crate::store::ValueStore;

/// One scheduled quantity, e.g. `HeatingSetpointSchedule` for all zones of a list.
#[derive(Clone, Debug)]
pub struct ScheduleDefinition {
    pub quantity: String,
    pub unit: String,
    pub reference_type: ReferenceType,
    /// Resolved ids of the object list the schedule is defined for.
    pub object_ids: Vec<ObjectId>,
    pub series: TimeSeries,
}

/// Answers `<type>(id=N).<quantity>` for every N of each definition's object list.
///
/// All objects of one definition share a single value slot. Schedules are consulted after
/// regular results, so a model publishing the same key takes precedence.
#[derive(Debug)]
pub struct Schedules {
    definitions: Vec<ScheduleDefinition>,
    slots: Vec<ValueRange>,
}

impl Schedules {
    pub fn new(definitions: Vec<ScheduleDefinition>) -> Self {
        Self {
            definitions,
            slots: Vec::new(),
        }
    }

    fn write_values(&self, t: f64, store: &ValueStore) {
        for (def, slot) in self.definitions.iter().zip(&self.slots) {
            store.set(slot.start, def.series.value_at(t));
        }
    }
}

impl Model for Schedules {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Schedule
    }

    fn id(&self) -> ObjectId {
        0
    }

    fn display_name(&self) -> &str {
        "Schedules"
    }

    fn model_type(&self) -> &'static str {
        "Schedules"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        self.definitions
            .iter()
            .map(|d| {
                QuantityDescription::scalar(
                    d.quantity.as_str(),
                    d.unit.as_str(),
                    format!("Schedule for {} objects {:?}", d.reference_type, d.object_ids),
                    false,
                )
            })
            .collect()
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slots = slots;
    }

    fn write_initial_results(&self, store: &ValueStore) {
        self.write_values(0.0, store);
    }

    fn lookup_stage(&self) -> LookupStage {
        LookupStage::Schedule
    }

    fn published_keys(&self) -> Vec<(ResultKey, usize)> {
        let mut keys = Vec::new();
        for (i, d) in self.definitions.iter().enumerate() {
            for id in &d.object_ids {
                keys.push((
                    ResultKey {
                        reference_type: d.reference_type,
                        id: *id,
                        name: d.quantity.clone(),
                    },
                    i,
                ));
            }
        }
        keys
    }

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        Some(self)
    }
}

impl TimeDependency for Schedules {
    fn set_time(&mut self, t: f64, store: &ValueStore) -> Result<(), UpdateError> {
        self.write_values(t, store);
        Ok(())
    }
}
