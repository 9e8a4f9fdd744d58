//! Compile a project description into an initialized engine.

use std::collections::HashMap;

use bes_core::units::constants::{C_AIR, RHO_AIR};
use bes_core::units::{hours, to_seconds};
use bes_core::{InputReference, ObjectId, QuantityName, ReferenceType, ValueRange, ValueRef};
use bes_model::models::{
    ExternalInput, ExternalInputs, HeatLoadSummationModel, IdealHeatingCoolingModel, Interpolation,
    Loads, NaturalVentilationModel, OutputHandle, OutputSampler, ScheduleDefinition, Schedules,
    Setpoints, ThermostatMode, ThermostatModel, TimeSeries, VentilationRate, ZoneModel,
};
use bes_model::{Engine, EngineConfig, GroupSolverConfig, ObjectList, ObjectRegistry};
use bes_project::{InterpolationDef, ModelDef, Project, SeriesDef};

use crate::error::{AppError, AppResult};

/// Object id of the output sampler; project model ids are validated against it.
pub const OUTPUT_SAMPLER_ID: ObjectId = ObjectId::MAX;

/// Zone air temperature integrated by the run driver.
#[derive(Debug, Clone)]
pub struct ZoneState {
    pub id: ObjectId,
    /// Heat capacity of the zone air [J/K].
    pub capacity: f64,
    pub temperature: ValueRef,
    pub heat_loads: Vec<ValueRange>,
}

/// A compiled, initialized simulation.
pub struct CompiledProject {
    pub engine: Engine,
    pub zones: Vec<ZoneState>,
    pub outputs: Option<OutputHandle>,
    pub start_s: f64,
    pub end_s: f64,
}

pub fn engine_config(project: &Project) -> EngineConfig {
    let s = &project.solver;
    let mut group = GroupSolverConfig {
        max_iterations: s.max_iterations,
        ..GroupSolverConfig::default()
    };
    group.tolerances.rel = s.rel_tol;
    group.tolerances.abs_band = s.abs_tol;
    EngineConfig {
        group,
        parallel: s.parallel,
        strict_dependencies: s.strict_dependencies,
    }
}

/// Time series with sample times converted from hours to seconds.
pub fn time_series(def: &SeriesDef) -> AppResult<TimeSeries> {
    let times = def.times_h.iter().map(|h| to_seconds(hours(*h))).collect();
    let interpolation = match def.interpolation {
        InterpolationDef::Linear => Interpolation::Linear,
        InterpolationDef::Step => Interpolation::Step,
    };
    let mut series = TimeSeries::new(times, def.values.clone())?.with_interpolation(interpolation);
    if let Some(p) = def.period_h {
        series = series.with_period(to_seconds(hours(p)))?;
    }
    Ok(series)
}

fn registry(project: &Project) -> ObjectRegistry {
    let mut registry = ObjectRegistry::new();
    registry.register(ReferenceType::Location, 0);
    for zone in &project.zones {
        registry.register(ReferenceType::Zone, zone.id);
    }
    for model in &project.models {
        registry.register(ReferenceType::Model, model.id());
    }
    registry
}

struct ResolvedList {
    reference_type: ReferenceType,
    ids: Vec<ObjectId>,
}

fn resolve_object_lists(
    project: &Project,
    registry: &ObjectRegistry,
) -> AppResult<HashMap<String, ResolvedList>> {
    let mut lists = HashMap::new();
    for def in &project.object_lists {
        let list = ObjectList::parse(def.name.as_str(), def.reference_type, &def.filter)?;
        let ids = list.resolve(registry);
        tracing::debug!(list = %def.name, ids = ?ids, "object list resolved");
        lists.insert(
            def.name.clone(),
            ResolvedList {
                reference_type: def.reference_type,
                ids,
            },
        );
    }
    Ok(lists)
}

fn list<'a>(lists: &'a HashMap<String, ResolvedList>, name: &str) -> AppResult<&'a ResolvedList> {
    lists
        .get(name)
        .ok_or_else(|| AppError::Compile(format!("unknown object list '{}'", name)))
}

fn parse_reference(text: &str) -> AppResult<InputReference> {
    Ok(text.parse::<InputReference>()?)
}

/// Build and initialize the engine for `project`.
///
/// Registration order (climate, zones, schedules, external inputs, models in file order,
/// outputs) fixes the scheduling tie-breaks and the checkpoint layout.
pub fn compile_project(project: &Project) -> AppResult<CompiledProject> {
    if project.models.iter().any(|m| m.id() == OUTPUT_SAMPLER_ID) {
        return Err(AppError::Compile(format!(
            "model id {} is reserved",
            OUTPUT_SAMPLER_ID
        )));
    }
    let registry = registry(project);
    let lists = resolve_object_lists(project, &registry)?;
    let mut engine = Engine::new(engine_config(project));

    let climate = time_series(&project.climate.temperature_c)?;
    engine.register(Box::new(Loads::from_celsius("Climate", climate)))?;

    for zone in &project.zones {
        engine.register(Box::new(ZoneModel::new(
            zone.id,
            zone.name.as_str(),
            zone.volume_m3,
            zone.initial_temperature_c,
        )?))?;
    }

    if !project.schedules.is_empty() {
        let mut definitions = Vec::with_capacity(project.schedules.len());
        for def in &project.schedules {
            let target = list(&lists, &def.object_list)?;
            definitions.push(ScheduleDefinition {
                quantity: def.quantity.clone(),
                unit: def.unit.clone(),
                reference_type: target.reference_type,
                object_ids: target.ids.clone(),
                series: time_series(&def.series)?,
            });
        }
        engine.register(Box::new(Schedules::new(definitions)))?;
    }

    if !project.external_inputs.is_empty() {
        let mut inputs = Vec::with_capacity(project.external_inputs.len());
        for def in &project.external_inputs {
            let series = time_series(&def.series)?;
            inputs.push(ExternalInput {
                target: parse_reference(&def.target)?.result_key(),
                unit: def.unit.clone(),
                initial: series.value_at(0.0),
                series: Some(series),
            });
        }
        engine.register(Box::new(ExternalInputs::new(inputs)))?;
    }

    for def in &project.models {
        let target = list(&lists, def.object_list())?;
        let ids = target.ids.clone();
        match def {
            ModelDef::NaturalVentilation {
                id,
                name,
                air_change_rate_per_h,
                ..
            } => {
                let rate = air_change_rate_per_h.map_or(VentilationRate::Scheduled, VentilationRate::Constant);
                engine.register(Box::new(NaturalVentilationModel::new(*id, name.as_str(), ids, rate)?))?;
            }
            ModelDef::HeatLoadSummation {
                id,
                name,
                quantity,
                zone_cooling_load,
                ..
            } => {
                let quantity: QuantityName = quantity.parse()?;
                let model = HeatLoadSummationModel::new(
                    *id,
                    name.as_str(),
                    target.reference_type,
                    ids,
                    quantity,
                )
                .with_zone_cooling_load(*zone_cooling_load);
                engine.register(Box::new(model))?;
            }
            ModelDef::Thermostat {
                id,
                name,
                reference_zone,
                heating_setpoint_c,
                cooling_setpoint_c,
                controller,
                ..
            } => {
                let mode = reference_zone.map_or(ThermostatMode::PerZone, ThermostatMode::ReferenceZone);
                let setpoints = match (heating_setpoint_c, cooling_setpoint_c) {
                    (Some(heating), Some(cooling)) => Setpoints::Constant {
                        heating: *heating,
                        cooling: *cooling,
                    },
                    _ => Setpoints::Scheduled,
                };
                engine.register(Box::new(ThermostatModel::new(
                    *id,
                    name.as_str(),
                    ids,
                    mode,
                    setpoints,
                    controller,
                )?))?;
            }
            ModelDef::IdealHeatingCooling {
                id,
                name,
                thermostat,
                max_heating_w,
                max_cooling_w,
                ..
            } => {
                engine.register(Box::new(IdealHeatingCoolingModel::new(
                    *id,
                    name.as_str(),
                    ids,
                    *thermostat,
                    *max_heating_w,
                    *max_cooling_w,
                )?))?;
            }
        }
    }

    let outputs = if project.outputs.is_empty() {
        None
    } else {
        let references = project
            .outputs
            .iter()
            .map(|o| parse_reference(o))
            .collect::<AppResult<Vec<_>>>()?;
        let (sampler, handle) = OutputSampler::new(OUTPUT_SAMPLER_ID, references);
        engine.register(Box::new(sampler))?;
        Some(handle)
    };

    engine.initialize()?;

    let mut zones = Vec::with_capacity(project.zones.len());
    for zone in &project.zones {
        let air = InputReference::required(
            ReferenceType::Zone,
            zone.id,
            QuantityName::new("AirTemperature"),
        );
        let temperature = engine
            .find_result(&air)
            .ok_or_else(|| AppError::Compile(format!("{} is not published", air)))?
            .start;
        let mut heat_loads = Vec::with_capacity(zone.heat_loads.len());
        for text in &zone.heat_loads {
            let reference = parse_reference(text)?;
            let range = engine.find_result(&reference).ok_or_else(|| {
                AppError::Compile(format!(
                    "heat load {} of zone {} has no producer",
                    reference, zone.id
                ))
            })?;
            heat_loads.push(range);
        }
        zones.push(ZoneState {
            id: zone.id,
            capacity: RHO_AIR * C_AIR * zone.volume_m3,
            temperature,
            heat_loads,
        });
    }

    tracing::info!(
        project = %project.name,
        models = engine.node_count(),
        zones = zones.len(),
        "project compiled"
    );

    Ok(CompiledProject {
        engine,
        zones,
        outputs,
        start_s: to_seconds(hours(project.simulation.start_h)),
        end_s: to_seconds(hours(project.simulation.end_h)),
    })
}
