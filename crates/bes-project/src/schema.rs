//! Project schema definitions.

use bes_controls::ControllerSpec;
use bes_core::{ObjectId, ReferenceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    pub simulation: SimulationDef,
    #[serde(default)]
    pub solver: SolverDef,
    pub climate: ClimateDef,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub object_lists: Vec<ObjectListDef>,
    #[serde(default)]
    pub schedules: Vec<ScheduleDef>,
    #[serde(default)]
    pub models: Vec<ModelDef>,
    #[serde(default)]
    pub external_inputs: Vec<ExternalInputDef>,
    /// Quantities recorded per accepted step, e.g. `Zone(id=1).AirTemperature`.
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Project {
    pub fn object_list(&self, name: &str) -> Option<&ObjectListDef> {
        self.object_lists.iter().find(|l| l.name == name)
    }

    pub fn zone(&self, id: ObjectId) -> Option<&ZoneDef> {
        self.zones.iter().find(|z| z.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    #[serde(default)]
    pub start_h: f64,
    pub end_h: f64,
    pub step_s: f64,
    /// Smallest step the driver may cut back to.
    #[serde(default = "default_min_step")]
    pub min_step_s: f64,
    /// Cutbacks allowed per step before the run is aborted.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_min_step() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub strict_dependencies: bool,
}

fn default_max_iterations() -> usize {
    100
}

fn default_rel_tol() -> f64 {
    1e-9
}

fn default_abs_tol() -> f64 {
    0.1
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            rel_tol: default_rel_tol(),
            abs_tol: default_abs_tol(),
            parallel: false,
            strict_dependencies: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationDef {
    #[default]
    Linear,
    Step,
}

/// Samples at hours since simulation start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesDef {
    pub times_h: Vec<f64>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub interpolation: InterpolationDef,
    /// Repeat period in hours (24 for daily profiles).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_h: Option<f64>,
}

impl SeriesDef {
    pub fn constant(value: f64) -> Self {
        Self {
            times_h: vec![0.0],
            values: vec![value],
            interpolation: InterpolationDef::Step,
            period_h: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClimateDef {
    /// Outside air temperature in degrees Celsius.
    pub temperature_c: SeriesDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneDef {
    pub id: ObjectId,
    pub name: String,
    pub volume_m3: f64,
    pub initial_temperature_c: f64,
    /// Results summed into the zone heat balance [W], e.g. `Model(id=10).TotalLoad`.
    #[serde(default)]
    pub heat_loads: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectListDef {
    pub name: String,
    pub reference_type: ReferenceType,
    /// `all`, `*` or comma separated ids and closed ranges (`1,4,10-20`).
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub object_list: String,
    pub quantity: String,
    pub unit: String,
    pub series: SeriesDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDef {
    NaturalVentilation {
        id: ObjectId,
        name: String,
        zone_list: String,
        /// Air change rate in 1/h; omitted means `VentilationRateSchedule` per zone.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        air_change_rate_per_h: Option<f64>,
    },
    HeatLoadSummation {
        id: ObjectId,
        name: String,
        object_list: String,
        quantity: String,
        #[serde(default)]
        zone_cooling_load: bool,
    },
    Thermostat {
        id: ObjectId,
        name: String,
        zone_list: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_zone: Option<ObjectId>,
        /// Constant setpoints in degrees Celsius; omitted means scheduled setpoints.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heating_setpoint_c: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cooling_setpoint_c: Option<f64>,
        controller: ControllerSpec,
    },
    IdealHeatingCooling {
        id: ObjectId,
        name: String,
        zone_list: String,
        thermostat: ObjectId,
        max_heating_w: f64,
        max_cooling_w: f64,
    },
}

impl ModelDef {
    pub fn id(&self) -> ObjectId {
        match self {
            ModelDef::NaturalVentilation { id, .. }
            | ModelDef::HeatLoadSummation { id, .. }
            | ModelDef::Thermostat { id, .. }
            | ModelDef::IdealHeatingCooling { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ModelDef::NaturalVentilation { name, .. }
            | ModelDef::HeatLoadSummation { name, .. }
            | ModelDef::Thermostat { name, .. }
            | ModelDef::IdealHeatingCooling { name, .. } => name,
        }
    }

    /// Name of the object list the model operates on.
    pub fn object_list(&self) -> &str {
        match self {
            ModelDef::NaturalVentilation { zone_list, .. }
            | ModelDef::Thermostat { zone_list, .. }
            | ModelDef::IdealHeatingCooling { zone_list, .. } => zone_list,
            ModelDef::HeatLoadSummation { object_list, .. } => object_list,
        }
    }
}

/// A value supplied from outside the simulation, replacing a model result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalInputDef {
    /// Reference of the replaced result, e.g. `Location(id=0).Temperature`.
    pub target: String,
    pub unit: String,
    pub series: SeriesDef,
}
