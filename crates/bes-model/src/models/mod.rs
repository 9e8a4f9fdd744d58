//! Concrete models wired by the engine.

pub mod external;
pub mod ideal_heating_cooling;
pub mod loads;
pub mod output;
pub mod schedules;
pub mod series;
pub mod summation;
pub mod thermostat;
pub mod ventilation;
pub mod zone;

pub use external::{ExternalInput, ExternalInputs};
pub use ideal_heating_cooling::IdealHeatingCoolingModel;
pub use loads::Loads;
pub use output::{OutputHandle, OutputSampler, OutputTable};
pub use schedules::{ScheduleDefinition, Schedules};
pub use series::{Interpolation, TimeSeries};
pub use summation::HeatLoadSummationModel;
pub use thermostat::{Setpoints, ThermostatMode, ThermostatModel};
pub use ventilation::{NaturalVentilationModel, VentilationRate};
pub use zone::ZoneModel;
