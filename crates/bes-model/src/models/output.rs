//! Output sampling of arbitrary published quantities.

use std::sync::{Arc, Mutex};

use bes_core::{InputReference, ObjectId, QuantityDescription, ValueRange};
use bes_graph::PRIORITY_OFFSET_TAIL;

use crate::capability::{Model, ResolvedInput, StateDependency, TimeDependency};
use crate::error::{ModelResult, UpdateError};
use crate::store::ValueStore;

/// Sampled values of all accepted steps.
///
/// Whole-vector references expand to one column per element, suffixed `#position`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<(f64, Vec<f64>)>,
}

impl OutputTable {
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let c = self.columns.iter().position(|n| n == name)?;
        Some(self.rows.iter().filter_map(|(_, v)| v.get(c).copied()).collect())
    }
}

/// Shared view on the table an [`OutputSampler`] fills.
pub type OutputHandle = Arc<Mutex<OutputTable>>;

/// Reads configured quantities after all other models and records them per accepted step.
///
/// Runs in the tail tier so it sees settled values. Output references are required: an
/// output naming a quantity nobody publishes is a configuration error.
#[derive(Debug)]
pub struct OutputSampler {
    id: ObjectId,
    references: Vec<InputReference>,
    inputs: Vec<ResolvedInput>,
    latest: Vec<f64>,
    table: OutputHandle,
}

impl OutputSampler {
    pub fn new(id: ObjectId, references: Vec<InputReference>) -> (Self, OutputHandle) {
        let table: OutputHandle = Arc::default();
        let references = references
            .into_iter()
            .map(|mut r| {
                r.required = true;
                r
            })
            .collect();
        let sampler = Self {
            id,
            references,
            inputs: Vec::new(),
            latest: Vec::new(),
            table: Arc::clone(&table),
        };
        (sampler, table)
    }
}

impl Model for OutputSampler {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn display_name(&self) -> &str {
        "Outputs"
    }

    fn model_type(&self) -> &'static str {
        "OutputSampler"
    }

    fn result_descriptions(&self) -> Vec<QuantityDescription> {
        Vec::new()
    }

    fn bind_results(&mut self, _slots: Vec<ValueRange>) {}

    fn as_time_dependency_mut(&mut self) -> Option<&mut dyn TimeDependency> {
        Some(self)
    }

    fn as_state_dependency(&self) -> Option<&dyn StateDependency> {
        Some(self)
    }

    fn as_state_dependency_mut(&mut self) -> Option<&mut dyn StateDependency> {
        Some(self)
    }
}

impl StateDependency for OutputSampler {
    fn input_references(&self) -> Vec<InputReference> {
        self.references.clone()
    }

    fn set_input_value_refs(&mut self, inputs: Vec<Option<ResolvedInput>>) -> ModelResult<()> {
        let mut columns = Vec::new();
        let mut resolved = Vec::new();
        for (reference, input) in self.references.iter().zip(inputs) {
            let Some(input) = input else { continue };
            if input.range.len == 1 {
                columns.push(reference.to_string());
            } else {
                for k in 0..input.range.len {
                    columns.push(format!("{}#{}", reference, k));
                }
            }
            resolved.push(input);
        }
        self.inputs = resolved;
        self.latest = vec![f64::NAN; columns.len()];
        if let Ok(mut table) = self.table.lock() {
            table.columns = columns;
            table.rows.clear();
        }
        Ok(())
    }

    fn priority_of_model_evaluation(&self) -> Option<u32> {
        Some(PRIORITY_OFFSET_TAIL)
    }

    fn update(&mut self, store: &ValueStore) -> Result<(), UpdateError> {
        self.latest.clear();
        for input in &self.inputs {
            self.latest.extend(store.read(input.range));
        }
        Ok(())
    }
}

impl TimeDependency for OutputSampler {
    fn set_time(&mut self, _t: f64, _store: &ValueStore) -> Result<(), UpdateError> {
        Ok(())
    }

    /// Only accepted steps are recorded; retried iterations never reach the table.
    fn step_completed(&mut self, t: f64) {
        match self.table.lock() {
            Ok(mut table) => table.rows.push((t, self.latest.clone())),
            Err(_) => tracing::warn!("output table lock poisoned; sample at t={} dropped", t),
        }
    }
}
