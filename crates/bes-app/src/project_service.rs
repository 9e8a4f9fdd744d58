//! Project loading and introspection.

use std::path::Path;

use bes_project::Project;

use crate::compile::compile_project;
use crate::error::{AppError, AppResult};

/// Load and validate a project file (YAML or JSON, by extension).
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(bes_project::load_path(path)?)
}

/// Summary of a compiled project.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub name: String,
    pub models: usize,
    pub zones: usize,
    pub groups: usize,
    pub implicit_groups: usize,
    /// One line per evaluation group, in execution order.
    pub schedule: String,
}

/// Compile the project and describe its evaluation schedule.
pub fn summarize(project: &Project) -> AppResult<ProjectSummary> {
    let compiled = compile_project(project)?;
    let schedule = compiled.engine.schedule();
    Ok(ProjectSummary {
        name: project.name.clone(),
        models: compiled.engine.node_count(),
        zones: compiled.zones.len(),
        groups: schedule.groups.len(),
        implicit_groups: schedule.cyclic_groups().count(),
        schedule: compiled.engine.describe_schedule(),
    })
}
