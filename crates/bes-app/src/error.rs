//! Error types for the bes-app service layer.

use std::path::PathBuf;

use bes_model::EvalError;

/// Application error type wrapping errors from the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Evaluation failed at t={t} s: {source}")]
    Evaluation {
        t: f64,
        #[source]
        source: EvalError,
    },

    #[error("Step at t={t} s cut back below {min_dt} s: {source}")]
    StepTooSmall {
        t: f64,
        min_dt: f64,
        #[source]
        source: EvalError,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit status: 1 for errors a smaller step might have avoided, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Evaluation { source, .. } => source.code(),
            AppError::StepTooSmall { .. } => 1,
            _ => 2,
        }
    }
}

/// Result type for bes-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<bes_project::ProjectError> for AppError {
    fn from(err: bes_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<bes_model::ModelError> for AppError {
    fn from(err: bes_model::ModelError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<bes_core::CoreError> for AppError {
    fn from(err: bes_core::CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}
