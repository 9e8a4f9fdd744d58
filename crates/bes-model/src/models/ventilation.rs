//! Natural ventilation of a set of zones with outside air.

use bes_core::units::constants::{C_AIR, RHO_AIR};
use bes_core::units::per_hour_to_per_second;
use bes_core::{
    IndexKeyType, InputReference, ObjectId, QuantityDescription, QuantityName, ReferenceType,
    ValueRange,
};

use crate::capability::{DependencyPair, Model, ResolvedInput, StateDependency};
use crate::error::{ModelError, ModelResult, UpdateError};
use crate::store::ValueStore;

/// Air change rate source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VentilationRate {
    /// Fixed rate in 1/h for all zones.
    Constant(f64),
    /// Per-zone `Zone(id).VentilationRateSchedule` in 1/h.
    Scheduled,
}

#[derive(Clone, Copy, Debug)]
struct ZoneInputs {
    temperature: ResolvedInput,
    volume: ResolvedInput,
    rate_schedule: Option<ResolvedInput>,
}

/// Heat exchanged with ambient air: `rho * c * V * rate * (T_amb - T_zone)` per zone.
///
/// Results are vectors keyed by zone id:
/// - `VentilationRate` [1/s]
/// - `VentilationHeatFlux` [W], positive when the zone gains heat
#[derive(Debug)]
pub struct NaturalVentilationModel {
    id: ObjectId,
    name: String,
    zone_ids: Vec<ObjectId>,
    rate: VentilationRate,
    ambient: Option<ResolvedInput>,
    zones: Vec<ZoneInputs>,
    slots: Vec<ValueRange>,
}

impl NaturalVentilationModel {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        zone_ids: Vec<ObjectId>,
        rate: VentilationRate,
    ) -> ModelResult<Self> {
        let name = name.into();
        if let VentilationRate::Constant(r) = rate {
            if !(r >= 0.0) {
                return Err(ModelError::invalid(&name, "ventilation rate must be >= 0"));
            }
        }
        Ok(Self {
            id,
            name,
            zone_ids,
            rate,
            ambient: None,
            zones: Vec::new(),
            slots: Vec::new(),
        })
    }

    fn inputs_per_zone(&self) -> usize {
        match self.rate {
            VentilationRate::Constant(_) => 2,
            VentilationRate::Scheduled => 3,
        }
    }
}

impl Model for NaturalVentilationModel {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> &'static str {
        "NaturalVentilationModel"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        vec![
            QuantityDescription::vector(
                "VentilationRate",
                "1/s",
                "Natural ventilation rate",
                false,
                IndexKeyType::ObjectId,
                self.zone_ids.clone(),
            ),
            QuantityDescription::vector(
                "VentilationHeatFlux",
                "W",
                "Natural ventilation heat flux into the zone",
                false,
                IndexKeyType::ObjectId,
                self.zone_ids.clone(),
            ),
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

impl StateDependency for NaturalVentilationModel {
    fn input_references(&self) -> Vec<InputReference> {
        let mut refs = vec![InputReference::required(
            ReferenceType::Location,
            0,
            QuantityName::new("Temperature"),
        )];
        for z in &self.zone_ids {
            refs.push(InputReference::required(
                ReferenceType::Zone,
                *z,
                QuantityName::new("AirTemperature"),
            ));
            refs.push(InputReference::required(
                ReferenceType::Zone,
                *z,
                QuantityName::new("Volume"),
            ));
            if self.rate == VentilationRate::Scheduled {
                refs.push(InputReference::required(
                    ReferenceType::Zone,
                    *z,
                    QuantityName::new("VentilationRateSchedule"),
                ));
            }
        }
        refs
    }

    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()> {
        let missing = || ModelError::invalid(&self.name, "required input was not resolved");
        let (ambient, per_zone) = inputs.split_first().ok_or_else(missing)?;
        self.ambient = Some(ambient.ok_or_else(missing)?);

        let mut zones = Vec::with_capacity(self.zone_ids.len());
        for chunk in per_zone.chunks(self.inputs_per_zone()) {
            let rate_schedule = match self.rate {
                VentilationRate::Scheduled => Some(chunk.get(2).copied().flatten().ok_or_else(missing)?),
                VentilationRate::Constant(_) => None,
            };
            zones.push(ZoneInputs {
                temperature: chunk.first().copied().flatten().ok_or_else(missing)?,
                volume: chunk.get(1).copied().flatten().ok_or_else(missing)?,
                rate_schedule,
            });
        }
        if zones.len() != self.zone_ids.len() {
            return Err(missing());
        }
        self.zones = zones;
        Ok(())
    }

    /// Each zone's results depend on ambient and that zone's inputs only.
    fn state_dependencies(&self) -> Option<Vec<DependencyPair>> {
        let (Some(ambient), [rate, flux]) = (self.ambient, self.slots.as_slice()) else {
            return Some(Vec::new());
        };
        let mut pairs = Vec::new();
        for (i, zone) in self.zones.iter().enumerate() {
            let (Some(rate_slot), Some(flux_slot)) = (rate.get(i as u32), flux.get(i as u32)) else {
                continue;
            };
            pairs.push((flux_slot, ambient.range.start));
            pairs.push((flux_slot, zone.temperature.range.start));
            if let Some(schedule) = zone.rate_schedule {
                pairs.push((rate_slot, schedule.range.start));
                pairs.push((flux_slot, schedule.range.start));
            }
        }
        Some(pairs)
    }

    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError> {
        let (Some(ambient), [rate_slots, flux_slots]) = (self.ambient, self.slots.as_slice()) else {
            return Err(UpdateError::fatal("model was not initialized"));
        };
        let t_ambient = ambient.value(store);

        for (i, (zone_id, zone)) in self.zone_ids.iter().zip(&self.zones).enumerate() {
            let rate_per_hour = match (self.rate, zone.rate_schedule) {
                (VentilationRate::Constant(r), _) => r,
                (VentilationRate::Scheduled, Some(s)) => s.value(store),
                (VentilationRate::Scheduled, None) => 0.0,
            };
            if !(rate_per_hour >= 0.0) {
                return Err(UpdateError::fatal(format!(
                    "ventilation rate {} 1/h for zone {} is negative or invalid",
                    rate_per_hour, zone_id
                )));
            }
            let rate = per_hour_to_per_second(rate_per_hour);
            let volume = zone.volume.value(store);
            let t_zone = zone.temperature.value(store);
            let flux = RHO_AIR * C_AIR * volume * rate * (t_ambient - t_zone);

            if let (Some(r), Some(f)) = (rate_slots.get(i as u32), flux_slots.get(i as u32)) {
                store.set(r, rate);
                store.set(f, flux);
            }
        }
        Ok(())
    }
}
