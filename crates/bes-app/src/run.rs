//! Fixed-step run driver with step cutback, and checkpoint files.
//!
//! Zone air temperatures are integrated with explicit Euler from the heat loads the
//! engine publishes. A step is attempted at `t + dt`; recoverable failures halve `dt`
//! and retry from the committed state, accepted steps let the step size grow back.
//! Models commit persistent state only through `step_completed` of an accepted step.

use std::path::Path;

use bes_core::ObjectId;
use bes_model::models::OutputHandle;
use bes_model::{Engine, EvalError};
use bes_project::Project;
use serde::{Deserialize, Serialize};

use crate::compile::{CompiledProject, ZoneState};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub dt: f64,
    pub min_dt: f64,
    /// Cutbacks allowed within one step.
    pub max_retries: u32,
    pub t_end: f64,
}

impl RunOptions {
    pub fn from_project(project: &Project, t_end: f64) -> Self {
        let sim = &project.simulation;
        Self {
            dt: sim.step_s,
            min_dt: sim.min_step_s,
            max_retries: sim.max_retries,
            t_end,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub cutbacks: usize,
    pub fixed_point_iterations: usize,
    pub t_final: f64,
}

/// Progress report after every accepted step.
#[derive(Debug, Clone)]
pub struct StepProgress {
    pub t: f64,
    pub dt: f64,
    pub t_end: f64,
    pub step: usize,
    pub cutbacks: usize,
}

/// Persisted run state: time, integrated zone temperatures and the engine image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub t: f64,
    pub dt: f64,
    pub zone_temperatures: Vec<(ObjectId, f64)>,
    pub engine: Vec<u8>,
}

pub struct Simulation {
    engine: Engine,
    zones: Vec<ZoneState>,
    outputs: Option<OutputHandle>,
    t: f64,
    /// Step size to try next; shrinks on cutbacks and regrows on success.
    dt: Option<f64>,
    started: bool,
}

impl Simulation {
    pub fn new(compiled: CompiledProject) -> Self {
        Self {
            engine: compiled.engine,
            zones: compiled.zones,
            outputs: compiled.outputs,
            t: compiled.start_s,
            dt: None,
            started: false,
        }
    }

    /// Simulation from an engine assembled by hand; `zones` name the integrated states.
    pub fn from_engine(engine: Engine, zones: Vec<ZoneState>, t_start: f64) -> Self {
        Self {
            engine,
            zones,
            outputs: None,
            t: t_start,
            dt: None,
            started: false,
        }
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn outputs(&self) -> Option<&OutputHandle> {
        self.outputs.as_ref()
    }

    pub fn zone_temperature(&self, id: ObjectId) -> Option<f64> {
        self.zones
            .iter()
            .find(|z| z.id == id)
            .map(|z| self.engine.value(z.temperature))
    }

    fn temperatures(&self) -> Vec<f64> {
        self.zones
            .iter()
            .map(|z| self.engine.value(z.temperature))
            .collect()
    }

    fn set_temperatures(&self, values: &[f64]) {
        for (z, v) in self.zones.iter().zip(values) {
            self.engine.set_value(z.temperature, *v);
        }
    }

    fn heat_load(&self, zone: &ZoneState) -> f64 {
        zone.heat_loads
            .iter()
            .map(|r| self.engine.store().sum(*r))
            .sum()
    }

    /// Evaluate and accept the initial state, so outputs start at `t_start`.
    fn start(&mut self) -> AppResult<usize> {
        let t = self.t;
        let evaluation = |e| AppError::Evaluation { t, source: e };
        self.engine.set_time(t).map_err(evaluation)?;
        let stats = self.engine.evaluate().map_err(evaluation)?;
        self.engine.step_completed(t);
        self.started = true;
        Ok(stats.fixed_point_iterations)
    }

    /// One explicit Euler attempt from the committed state at `self.t` to `self.t + dt`.
    fn attempt(&mut self, dt: f64) -> Result<usize, EvalError> {
        self.engine.set_time(self.t)?;
        let mut iterations = self.engine.evaluate()?.fixed_point_iterations;
        let next: Vec<f64> = self
            .zones
            .iter()
            .map(|z| self.engine.value(z.temperature) + dt * self.heat_load(z) / z.capacity)
            .collect();
        self.set_temperatures(&next);
        self.engine.set_time(self.t + dt)?;
        iterations += self.engine.evaluate()?.fixed_point_iterations;
        Ok(iterations)
    }

    /// Advance to `opts.t_end`.
    pub fn run(
        &mut self,
        opts: &RunOptions,
        mut progress: Option<&mut dyn FnMut(&StepProgress)>,
    ) -> AppResult<RunSummary> {
        if !(opts.dt > 0.0) || !(opts.min_dt > 0.0) || opts.min_dt > opts.dt {
            return Err(AppError::InvalidInput(format!(
                "step sizes dt={} min_dt={} are inconsistent",
                opts.dt, opts.min_dt
            )));
        }
        let mut summary = RunSummary::default();
        if !self.started {
            summary.fixed_point_iterations += self.start()?;
        }

        // Float noise in t must not trigger a sliver step at the end.
        let eps = opts.min_dt * 1e-6;
        let mut dt = self.dt.unwrap_or(opts.dt).min(opts.dt);
        while self.t < opts.t_end - eps {
            let committed = self.temperatures();
            let mut retries = 0;
            loop {
                let step = dt.min(opts.t_end - self.t);
                match self.attempt(step) {
                    Ok(iterations) => {
                        summary.fixed_point_iterations += iterations;
                        self.t += step;
                        self.engine.step_completed(self.t);
                        summary.steps += 1;
                        dt = (dt * 2.0).min(opts.dt);
                        break;
                    }
                    Err(e) if e.is_recoverable() => {
                        self.set_temperatures(&committed);
                        let smaller = step * 0.5;
                        if retries >= opts.max_retries || smaller < opts.min_dt {
                            return Err(AppError::StepTooSmall {
                                t: self.t,
                                min_dt: opts.min_dt,
                                source: e,
                            });
                        }
                        tracing::warn!(t = self.t, dt = step, error = %e, "step rejected, cutting back");
                        retries += 1;
                        summary.cutbacks += 1;
                        dt = smaller;
                    }
                    Err(e) => {
                        return Err(AppError::Evaluation {
                            t: self.t,
                            source: e,
                        });
                    }
                }
            }
            self.dt = Some(dt);
            if let Some(cb) = progress.as_deref_mut() {
                cb(&StepProgress {
                    t: self.t,
                    dt,
                    t_end: opts.t_end,
                    step: summary.steps,
                    cutbacks: summary.cutbacks,
                });
            }
        }
        summary.t_final = self.t;
        tracing::info!(
            steps = summary.steps,
            cutbacks = summary.cutbacks,
            t = self.t,
            "run finished"
        );
        Ok(summary)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            t: self.t,
            dt: self.dt.unwrap_or(0.0),
            zone_temperatures: self
                .zones
                .iter()
                .map(|z| (z.id, self.engine.value(z.temperature)))
                .collect(),
            engine: self.engine.serialize(),
        }
    }

    /// Continue from a checkpoint written by a simulation of the same project.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> AppResult<()> {
        if checkpoint.zone_temperatures.len() != self.zones.len() {
            return Err(AppError::Checkpoint(format!(
                "checkpoint holds {} zones, project has {}",
                checkpoint.zone_temperatures.len(),
                self.zones.len()
            )));
        }
        for ((id, value), zone) in checkpoint.zone_temperatures.iter().zip(&self.zones) {
            if *id != zone.id {
                return Err(AppError::Checkpoint(format!(
                    "checkpoint zone {} does not match project zone {}",
                    id, zone.id
                )));
            }
            self.engine.set_value(zone.temperature, *value);
        }
        self.engine
            .deserialize(&checkpoint.engine)
            .map_err(|e| AppError::Checkpoint(e.to_string()))?;
        self.t = checkpoint.t;
        self.dt = (checkpoint.dt > 0.0).then_some(checkpoint.dt);
        self.started = true;
        Ok(())
    }
}

pub fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> AppResult<()> {
    let content = serde_json::to_string(checkpoint)
        .map_err(|e| AppError::Checkpoint(format!("failed to serialize checkpoint: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn read_checkpoint(path: &Path) -> AppResult<Checkpoint> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Checkpoint(format!("failed to parse {}: {}", path.display(), e)))
}
