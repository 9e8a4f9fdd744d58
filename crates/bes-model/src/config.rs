//! Engine policy.

use bes_core::Tolerances;

/// Fixed-point iteration policy for implicit (cyclic) groups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupSolverConfig {
    pub max_iterations: usize,
    pub tolerances: Tolerances,
}

impl Default for GroupSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerances: Tolerances::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub group: GroupSolverConfig,
    /// Evaluate independent groups of one level on the rayon pool.
    pub parallel: bool,
    /// Treat inputs missing from explicit state dependencies as configuration errors
    /// instead of adding fallback edges.
    pub strict_dependencies: bool,
}
