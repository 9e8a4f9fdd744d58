//! Model evaluation framework for building energy simulation.
//!
//! Provides:
//! - Capability traits for models (identity, time dependency, state dependency)
//! - A fixed value arena with stable handles shared by all models
//! - Object list and input reference resolution with batched configuration errors
//! - The evaluation engine: dependency collection, scheduling, implicit group solving,
//!   optional parallel evaluation of independent groups, checkpoint images
//! - Concrete models (climate loads, zones, ventilation, summation, thermostat,
//!   ideal heating/cooling, schedules, external inputs, output sampling)

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod object_list;
pub mod resolve;
pub mod store;

mod group;
mod node;

pub use capability::{
    DependencyPair, LookupStage, Model, ResolvedInput, StateDependency, TimeDependency,
};
pub use config::{EngineConfig, GroupSolverConfig};
pub use engine::{Engine, EvalStats};
pub use error::{ConfigIssue, EvalError, ModelError, ModelResult, ObjectListError, UpdateError};
pub use object_list::{IdFilter, ObjectList, ObjectRegistry};
pub use resolve::{Published, ResultIndex, resolve_inputs};
pub use store::ValueStore;
