//! Zone thermostats driving heating and cooling controllers.

use bes_controls::{Controller, ControllerSpec};
use bes_core::units::{degc, to_kelvin};
use bes_core::{
    IndexKeyType, InputReference, ObjectId, QuantityDescription, QuantityName, ReferenceType,
    ValueRange,
};

use crate::capability::{Model, ResolvedInput, StateDependency, TimeDependency};
use crate::error::{ModelError, ModelResult, UpdateError};
use crate::store::ValueStore;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Setpoints {
    /// Heating and cooling setpoints in degrees Celsius.
    Constant { heating: f64, cooling: f64 },
    /// `Zone(id).HeatingSetpointSchedule` / `CoolingSetpointSchedule` in K.
    Scheduled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThermostatMode {
    /// Each zone is controlled by its own air temperature.
    PerZone,
    /// All zones follow the air temperature (and schedules) of one reference zone.
    ReferenceZone(ObjectId),
}

#[derive(Clone, Copy, Debug)]
struct SensorInputs {
    temperature: ResolvedInput,
    heating_setpoint: Option<ResolvedInput>,
    cooling_setpoint: Option<ResolvedInput>,
}

/// Publishes `HeatingControlValue` and `CoolingControlValue` per zone.
///
/// Heating error is `setpoint_heating - T`, cooling error is `T - setpoint_cooling`.
/// Controller state is committed in `step_completed` and part of the restart blob.
#[derive(Debug)]
pub struct ThermostatModel {
    id: ObjectId,
    name: String,
    zone_ids: Vec<ObjectId>,
    mode: ThermostatMode,
    setpoints: Setpoints,
    heating: Vec<Box<dyn Controller>>,
    cooling: Vec<Box<dyn Controller>>,
    sensors: Vec<SensorInputs>,
    time: f64,
    slots: Vec<ValueRange>,
}

impl ThermostatModel {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        zone_ids: Vec<ObjectId>,
        mode: ThermostatMode,
        setpoints: Setpoints,
        controller: &ControllerSpec,
    ) -> ModelResult<Self> {
        let name = name.into();
        if let Setpoints::Constant { heating, cooling } = setpoints {
            if heating > cooling {
                return Err(ModelError::invalid(
                    &name,
                    format!(
                        "heating setpoint {} C is above cooling setpoint {} C",
                        heating, cooling
                    ),
                ));
            }
        }
        let sensor_count = match mode {
            ThermostatMode::PerZone => zone_ids.len(),
            ThermostatMode::ReferenceZone(_) => 1,
        };
        let mut heating = Vec::with_capacity(sensor_count);
        let mut cooling = Vec::with_capacity(sensor_count);
        for _ in 0..sensor_count {
            heating.push(controller.build()?);
            cooling.push(controller.build()?);
        }
        Ok(Self {
            id,
            name,
            zone_ids,
            mode,
            setpoints,
            heating,
            cooling,
            sensors: Vec::new(),
            time: 0.0,
            slots: Vec::new(),
        })
    }

    fn sensor_zones(&self) -> Vec<ObjectId> {
        match self.mode {
            ThermostatMode::PerZone => self.zone_ids.clone(),
            ThermostatMode::ReferenceZone(z) => vec![z],
        }
    }

    fn sensor_of(&self, zone_index: usize) -> usize {
        match self.mode {
            ThermostatMode::PerZone => zone_index,
            ThermostatMode::ReferenceZone(_) => 0,
        }
    }

    fn setpoints_k(&self, sensor: &SensorInputs, store: &ValueStore) -> (f64, f64) {
        match self.setpoints {
            Setpoints::Constant { heating, cooling } => {
                (to_kelvin(degc(heating)), to_kelvin(degc(cooling)))
            }
            Setpoints::Scheduled => (
                sensor.heating_setpoint.map_or(f64::NEG_INFINITY, |s| s.value(store)),
                sensor.cooling_setpoint.map_or(f64::INFINITY, |s| s.value(store)),
            ),
        }
    }

    fn load_controllers(&mut self, buf: &[u8]) -> ModelResult<()> {
        let mut rest = buf;
        for c in self.heating.iter_mut().chain(self.cooling.iter_mut()) {
            let (blob, tail) = rest.split_at(c.serialization_size().min(rest.len()));
            c.deserialize(blob)?;
            rest = tail;
        }
        Ok(())
    }

    fn controllers(&self) -> impl Iterator<Item = &Box<dyn Controller>> {
        self.heating.iter().chain(&self.cooling)
    }
}

impl Model for ThermostatModel {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "ThermostatModel"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        let vector = |name: &str, description: &str| {
            QuantityDescription::vector(
                name,
                "---",
                description,
                false,
                IndexKeyType::ObjectId,
                self.zone_ids.clone(),
            )
        };
        vec![
            vector("HeatingControlValue", "Heating control signal"),
            vector("CoolingControlValue", "Cooling control signal"),
        ]
    }

    fn bind_results(&mut self, slots: Vec<ValueRange>) {
        self.slots = slots;
    }

    fn serialization_size(&self) -> usize {
        self.controllers().map(|c| c.serialization_size()).sum()
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        for c in self.controllers() {
            c.serialize(buf);
        }
    }

    /// All controllers take their state from `buf`, or none does.
    fn deserialize(&mut self, buf: &[u8]) -> ModelResult<()> {
        if buf.len() != self.serialization_size() {
            return Err(ModelError::Checkpoint {
                what: format!(
                    "restart blob of {} has {} bytes, expected {}",
                    self.name,
                    buf.len(),
                    self.serialization_size()
                ),
            });
        }
        let mut saved = Vec::with_capacity(buf.len());
        self.serialize(&mut saved);
        if let Err(e) = self.load_controllers(buf) {
            if let Err(restore) = self.load_controllers(&saved) {
                tracing::error!(
                    model = %self.name,
                    error = %restore,
                    "could not put back controller state"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        Some(self)
    }

    fn as_state_dependency(&self) -> Option<&dyn StateDependency> {
        Some(self)
    }

    fn as_state_dependency_mut(&mut self) -> Option<&mut dyn StateDependency> {
        Some(self)
    }
}

impl StateDependency for ThermostatModel {
    fn input_references(&self) -> Vec<InputReference> {
        let mut refs = Vec::new();
        for z in self.sensor_zones() {
            refs.push(InputReference::required(
                ReferenceType::Zone,
                z,
                QuantityName::new("AirTemperature"),
            ));
            if self.setpoints == Setpoints::Scheduled {
                refs.push(InputReference::required(
                    ReferenceType::Zone,
                    z,
                    QuantityName::new("HeatingSetpointSchedule"),
                ));
                refs.push(InputReference::required(
                    ReferenceType::Zone,
                    z,
                    QuantityName::new("CoolingSetpointSchedule"),
                ));
            }
        }
        refs
    }

    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()> {
        let per_sensor = match self.setpoints {
            Setpoints::Constant { .. } => 1,
            Setpoints::Scheduled => 3,
        };
        let missing = || ModelError::invalid(&self.name, "required input was not resolved");
        let mut sensors = Vec::new();
        for chunk in inputs.chunks(per_sensor) {
            sensors.push(SensorInputs {
                temperature: chunk.first().copied().flatten().ok_or_else(missing)?,
                heating_setpoint: chunk.get(1).copied().flatten(),
                cooling_setpoint: chunk.get(2).copied().flatten(),
            });
        }
        if sensors.len() != self.heating.len() {
            return Err(missing());
        }
        self.sensors = sensors;
        Ok(())
    }

    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError> {
        let [heating_slots, cooling_slots] = self.slots.as_slice() else {
            return Err(UpdateError::fatal("model was not initialized"));
        };
        let (heating_slots, cooling_slots) = (*heating_slots, *cooling_slots);

        for (k, sensor) in self.sensors.iter().enumerate() {
            let t_air = sensor.temperature.value(store);
            let (sp_heat, sp_cool) = self.setpoints_k(sensor, store);
            if sp_heat > sp_cool {
                return Err(UpdateError::fatal(format!(
                    "heating setpoint {:.2} K above cooling setpoint {:.2} K for sensor zone {}",
                    sp_heat,
                    sp_cool,
                    self.sensor_zones().get(k).copied().unwrap_or_default()
                )));
            }
            if let (Some(h), Some(c)) = (self.heating.get_mut(k), self.cooling.get_mut(k)) {
                h.update(self.time, sp_heat - t_air);
                c.update(self.time, t_air - sp_cool);
            }
        }

        for i in 0..self.zone_ids.len() {
            let k = self.sensor_of(i);
            let (Some(h), Some(c)) = (self.heating.get(k), self.cooling.get(k)) else {
                continue;
            };
            if let Some(slot) = heating_slots.get(i as u32) {
                store.set(slot, h.control_value());
            }
            if let Some(slot) = cooling_slots.get(i as u32) {
                store.set(slot, c.control_value());
            }
        }
        Ok(())
    }
}

impl TimeDependency for ThermostatModel {
    fn set_time(&mut self, t: f64, _store: &ValueStore) -> Result<(), UpdateError> {
        self.time = t;
        Ok(())
    }

    fn step_completed(&mut self, t: f64) {
        for c in self.heating.iter_mut().chain(self.cooling.iter_mut()) {
            c.step_completed(t);
        }
    }
}
