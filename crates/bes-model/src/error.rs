//! Error types for model setup and evaluation.

use std::fmt;

use bes_controls::ControlError;
use bes_core::CoreError;
use bes_graph::GraphError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// One configuration problem, attributed to the model (or object list) it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub source: String,
    pub what: String,
}

impl ConfigIssue {
    pub fn new(source: impl Into<String>, what: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            what: what.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.what)
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Setup-time errors. Always fatal.
#[derive(Error, Debug)]
pub enum ModelError {
    /// All configuration problems found in one pass.
    #[error("{} configuration error(s):\n{}", .issues.len(), join_issues(.issues))]
    Configuration { issues: Vec<ConfigIssue> },

    #[error("Invalid parameter in {model}: {what}")]
    InvalidParameter { model: String, what: String },

    #[error("Invalid object list '{list}': {source}")]
    ObjectList {
        list: String,
        #[source]
        source: ObjectListError,
    },

    #[error("Engine used out of order: {what}")]
    Lifecycle { what: &'static str },

    #[error("Checkpoint error: {what}")]
    Checkpoint { what: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ModelError {
    pub fn invalid(model: impl Into<String>, what: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            model: model.into(),
            what: what.into(),
        }
    }

    /// Flatten into issues so that several failures can be reported together.
    pub fn into_issues(self, source: &str) -> Vec<ConfigIssue> {
        match self {
            ModelError::Configuration { issues } => issues,
            other => vec![ConfigIssue::new(source, other.to_string())],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectListError {
    #[error("id interval {lo}-{hi} must not include 0")]
    ZeroInInterval { lo: u32, hi: u32 },

    #[error("id interval {lo}-{hi} is reversed")]
    ReversedInterval { lo: u32, hi: u32 },

    #[error("cannot parse id filter '{text}'")]
    Syntax { text: String },

    #[error("id filter is empty")]
    Empty,
}

/// Failure reported by a single model's `update()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// Retry with a different input guess or a smaller step.
    #[error("{what}")]
    Recoverable { what: String },

    /// Physically impossible state; the run cannot continue.
    #[error("{what}")]
    Fatal { what: String },
}

impl UpdateError {
    pub fn recoverable(what: impl Into<String>) -> Self {
        UpdateError::Recoverable { what: what.into() }
    }

    pub fn fatal(what: impl Into<String>) -> Self {
        UpdateError::Fatal { what: what.into() }
    }
}

/// Failure of one scheduler pass, with node context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Recoverable error in {node}: {what}")]
    Recoverable { node: String, what: String },

    #[error("Fatal error in {node}: {what}")]
    Fatal { node: String, what: String },

    #[error(
        "Implicit group [{}] did not converge in {iterations} iterations (max change {max_change:e})",
        .members.join(", ")
    )]
    NotConverged {
        members: Vec<String>,
        iterations: usize,
        max_change: f64,
    },

    #[error("Engine used out of order: {what}")]
    Lifecycle { what: &'static str },
}

impl EvalError {
    pub(crate) fn from_update(node: &str, e: UpdateError) -> Self {
        match e {
            UpdateError::Recoverable { what } => EvalError::Recoverable {
                node: node.to_string(),
                what,
            },
            UpdateError::Fatal { what } => EvalError::Fatal {
                node: node.to_string(),
                what,
            },
        }
    }

    /// Integer status: 1 = recoverable (retry), 2 = fatal.
    pub fn code(&self) -> i32 {
        match self {
            EvalError::Recoverable { .. } | EvalError::NotConverged { .. } => 1,
            EvalError::Fatal { .. } | EvalError::Lifecycle { .. } => 2,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.code() == 1
    }
}
