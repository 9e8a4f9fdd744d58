//! Application service layer for the building energy simulation.
//!
//! Shared by the CLI: project loading, compilation of a project into an initialized
//! engine, and the fixed-step run driver with checkpoint files.

pub mod compile;
pub mod error;
pub mod project_service;
pub mod run;

pub use compile::{CompiledProject, OUTPUT_SAMPLER_ID, ZoneState, compile_project, engine_config};
pub use error::{AppError, AppResult};
pub use project_service::{ProjectSummary, load_project, summarize};
pub use run::{
    Checkpoint, RunOptions, RunSummary, Simulation, StepProgress, read_checkpoint,
    write_checkpoint,
};
