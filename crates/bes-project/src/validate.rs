//! Project validation logic.
//!
//! All problems are collected and reported together.

use std::collections::HashSet;
use std::fmt;

use bes_core::{InputReference, ReferenceType};
use bes_model::IdFilter;

use crate::schema::{ModelDef, Project, SeriesDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Every problem found in one project.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{} problem(s) in project:\n{}", .errors.len(), list(.errors))]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

fn list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    fn invalid(&mut self, field: impl Into<String>, value: impl fmt::Display, reason: impl Into<String>) {
        self.errors.push(ValidationError::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        });
    }

    fn missing(&mut self, id: impl Into<String>, context: impl Into<String>) {
        self.errors.push(ValidationError::MissingReference {
            id: id.into(),
            context: context.into(),
        });
    }

    fn duplicate(&mut self, id: impl Into<String>, context: impl Into<String>) {
        self.errors.push(ValidationError::DuplicateId {
            id: id.into(),
            context: context.into(),
        });
    }

    fn reference(&mut self, field: String, text: &str) {
        if let Err(e) = text.parse::<InputReference>() {
            self.invalid(field, text, e.to_string());
        }
    }

    fn series(&mut self, field: &str, series: &SeriesDef) {
        if series.times_h.is_empty() || series.times_h.len() != series.values.len() {
            self.invalid(
                format!("{field}.times_h"),
                series.times_h.len(),
                format!("needs at least one sample and {} values", series.values.len()),
            );
        }
        if series.times_h.windows(2).any(|w| !(w[0] < w[1])) {
            self.invalid(format!("{field}.times_h"), "..", "times must be strictly increasing");
        }
        if series.times_h.iter().chain(&series.values).any(|v| !v.is_finite()) {
            self.invalid(format!("{field}.values"), "..", "samples must be finite");
        }
        if let Some(p) = series.period_h {
            if !(p > 0.0) {
                self.invalid(format!("{field}.period_h"), p, "must be positive");
            }
        }
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationReport> {
    let mut c = Collector::default();

    let sim = &project.simulation;
    if !(sim.end_h > sim.start_h) {
        c.invalid("simulation.end_h", sim.end_h, "must be after start_h");
    }
    if !(sim.step_s > 0.0) {
        c.invalid("simulation.step_s", sim.step_s, "must be positive");
    }
    if !(sim.min_step_s > 0.0) || sim.min_step_s > sim.step_s {
        c.invalid("simulation.min_step_s", sim.min_step_s, "must be in (0, step_s]");
    }

    let solver = &project.solver;
    if solver.max_iterations == 0 {
        c.invalid("solver.max_iterations", 0, "must be at least 1");
    }
    if !(solver.rel_tol > 0.0) {
        c.invalid("solver.rel_tol", solver.rel_tol, "must be positive");
    }
    if !(solver.abs_tol >= 0.0) {
        c.invalid("solver.abs_tol", solver.abs_tol, "must not be negative");
    }

    c.series("climate.temperature_c", &project.climate.temperature_c);

    let mut zone_ids = HashSet::new();
    for zone in &project.zones {
        if !zone_ids.insert(zone.id) {
            c.duplicate(zone.id.to_string(), "zones");
        }
        if zone.id == 0 {
            c.invalid(format!("zone '{}'.id", zone.name), 0, "zone id 0 is reserved");
        }
        if !(zone.volume_m3 > 0.0) {
            c.invalid(format!("zone '{}'.volume_m3", zone.name), zone.volume_m3, "must be positive");
        }
        for load in &zone.heat_loads {
            c.reference(format!("zone '{}'.heat_loads", zone.name), load);
        }
    }

    let mut list_names = HashSet::new();
    for list in &project.object_lists {
        if !list_names.insert(list.name.as_str()) {
            c.duplicate(&list.name, "object_lists");
        }
        if let Err(e) = list.filter.parse::<IdFilter>() {
            c.invalid(format!("object list '{}'.filter", list.name), &list.filter, e.to_string());
        }
    }

    for (i, schedule) in project.schedules.iter().enumerate() {
        if project.object_list(&schedule.object_list).is_none() {
            c.missing(&schedule.object_list, format!("schedules[{i}]"));
        }
        c.series(&format!("schedules[{i}].series"), &schedule.series);
    }

    let mut model_ids = HashSet::new();
    for model in &project.models {
        let context = format!("model '{}'", model.name());
        if !model_ids.insert(model.id()) {
            c.duplicate(model.id().to_string(), "models");
        }
        match project.object_list(model.object_list()) {
            None => c.missing(model.object_list(), &context),
            Some(list) => {
                let zone_list = !matches!(model, ModelDef::HeatLoadSummation { .. });
                if zone_list && list.reference_type != ReferenceType::Zone {
                    c.invalid(
                        format!("{context}.zone_list"),
                        &list.name,
                        format!("object list has reference type {}", list.reference_type),
                    );
                }
            }
        }
        validate_model(&mut c, project, model, &context);
    }

    for (i, input) in project.external_inputs.iter().enumerate() {
        c.reference(format!("external_inputs[{i}].target"), &input.target);
        c.series(&format!("external_inputs[{i}].series"), &input.series);
    }

    for output in &project.outputs {
        c.reference("outputs".to_string(), output);
    }

    if c.errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { errors: c.errors })
    }
}

fn validate_model(c: &mut Collector, project: &Project, model: &ModelDef, context: &str) {
    match model {
        ModelDef::NaturalVentilation {
            air_change_rate_per_h: Some(rate),
            ..
        } if !(*rate >= 0.0) => {
            c.invalid(format!("{context}.air_change_rate_per_h"), rate, "must not be negative");
        }
        ModelDef::Thermostat {
            reference_zone,
            heating_setpoint_c,
            cooling_setpoint_c,
            controller,
            ..
        } => {
            match (heating_setpoint_c, cooling_setpoint_c) {
                (Some(h), Some(cool)) if h > cool => c.invalid(
                    format!("{context}.heating_setpoint_c"),
                    h,
                    format!("above cooling setpoint {cool}"),
                ),
                (Some(_), None) | (None, Some(_)) => c.invalid(
                    format!("{context}.setpoints"),
                    "one",
                    "give both constant setpoints or neither",
                ),
                _ => {}
            }
            if let Some(z) = reference_zone {
                if project.zone(*z).is_none() {
                    c.missing(z.to_string(), format!("{context}.reference_zone"));
                }
            }
            if let Err(e) = controller.build() {
                c.invalid(format!("{context}.controller"), "..", e.to_string());
            }
        }
        ModelDef::IdealHeatingCooling {
            thermostat,
            max_heating_w,
            max_cooling_w,
            ..
        } => {
            let is_thermostat = project
                .models
                .iter()
                .any(|m| matches!(m, ModelDef::Thermostat { id, .. } if id == thermostat));
            if !is_thermostat {
                c.missing(thermostat.to_string(), format!("{context}.thermostat"));
            }
            if !(*max_heating_w >= 0.0) || !(*max_cooling_w >= 0.0) {
                c.invalid(format!("{context}.max_power"), "..", "must not be negative");
            }
        }
        _ => {}
    }
}
