//! The evaluation engine: registration, initialization and per-step execution.

use std::collections::BTreeSet;

use bes_core::{
    InputReference, NodeIdx, ObjectId, QuantityDescription, QuantityName, ReferenceType,
    ValueRange, ValueRef,
};
use bes_graph::{DependencyGraphBuilder, EvaluationGroup, Schedule};
use rayon::prelude::*;

use crate::capability::{DependencyPair, Model};
use crate::config::EngineConfig;
use crate::error::{ConfigIssue, EvalError, ModelError, ModelResult};
use crate::group::evaluate_group;
use crate::node::ModelNode;
use crate::resolve::{Published, ResultIndex, resolve_inputs};
use crate::store::{SlotAllocator, ValueStore};

const CHECKPOINT_MAGIC: &[u8; 8] = b"BESCKPT1";

/// Counters of one `evaluate()` pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalStats {
    pub groups: usize,
    pub fixed_point_iterations: usize,
}

/// Owns all models, their value arena and the evaluation schedule.
///
/// Lifecycle: `register` models, `initialize` once, then per step `set_time`,
/// `evaluate` (any number of times) and `step_completed` for the accepted step.
pub struct Engine {
    config: EngineConfig,
    nodes: Vec<ModelNode>,
    store: ValueStore,
    index: ResultIndex,
    schedule: Schedule,
    initialized: bool,
    time: Option<f64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            store: ValueStore::default(),
            index: ResultIndex::new(),
            schedule: Schedule::default(),
            initialized: false,
            time: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add a model. Registration order is the tie-breaker for scheduling and the
    /// order of blobs in checkpoint images.
    pub fn register(&mut self, model: Box<dyn Model>) -> ModelResult<NodeIdx> {
        if self.initialized {
            return Err(ModelError::Lifecycle {
                what: "register after initialize",
            });
        }
        let idx = NodeIdx(self.nodes.len() as u32);
        self.nodes.push(ModelNode::new(idx, model));
        Ok(idx)
    }

    /// Allocate results, resolve inputs, collect dependencies and build the schedule.
    ///
    /// All configuration problems found are returned together.
    pub fn initialize(&mut self) -> ModelResult<()> {
        if self.initialized {
            return Err(ModelError::Lifecycle {
                what: "initialize called twice",
            });
        }

        self.allocate_results();
        let mut issues = self.build_index();
        issues.extend(self.resolve_all_inputs());
        if !issues.is_empty() {
            return Err(ModelError::Configuration { issues });
        }
        let issues = self.collect_dependencies();
        if !issues.is_empty() {
            return Err(ModelError::Configuration { issues });
        }

        let mut builder = DependencyGraphBuilder::new();
        for node in self.nodes.iter().filter(|n| n.is_state_dependent()) {
            let priority = node
                .model
                .as_state_dependency()
                .and_then(|sd| sd.priority_of_model_evaluation());
            builder.add_node(node.idx, node.name.clone(), priority, node.result_ranges());
            for (result, input) in &node.edges {
                builder.add_edge(node.idx, *result, *input);
            }
        }
        let edge_count = builder.edge_count();
        self.schedule = builder.build()?;
        self.initialized = true;

        tracing::info!(
            models = self.nodes.len(),
            slots = self.store.len(),
            published = self.index.len(),
            edges = edge_count,
            groups = self.schedule.groups.len(),
            implicit = self.schedule.cyclic_groups().count(),
            "model engine initialized"
        );
        Ok(())
    }

    fn allocate_results(&mut self) {
        let mut alloc = SlotAllocator::default();
        for node in &mut self.nodes {
            let descriptions = node.model.result_descriptions();
            let ranges: Vec<ValueRange> = descriptions
                .iter()
                .map(|d| alloc.allocate(d.len()))
                .collect();
            node.model.bind_results(ranges.clone());
            node.results = descriptions.into_iter().zip(ranges).collect();
        }
        self.store = ValueStore::new(alloc.allocated());
        for node in &self.nodes {
            node.model.write_initial_results(&self.store);
        }
    }

    fn build_index(&mut self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut index = ResultIndex::new();
        for node in &self.nodes {
            let stage = node.model.lookup_stage();
            for (key, di) in node.model.published_keys() {
                let Some((description, range)) = node.results.get(di) else {
                    issues.push(ConfigIssue::new(
                        &node.name,
                        format!("publishes {} for unknown result #{}", key, di),
                    ));
                    continue;
                };
                let published = Published {
                    node: node.idx,
                    description: description.clone(),
                    range: *range,
                };
                if let Err(issue) = index.insert(stage, key, published) {
                    issues.push(issue);
                }
            }
        }
        self.index = index;
        issues
    }

    fn resolve_all_inputs(&mut self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut resolved_count = 0;
        for node in &mut self.nodes {
            let Some(sd) = node.model.as_state_dependency() else {
                continue;
            };
            node.inputs = sd.input_references();
            node.resolved = resolve_inputs(&self.index, &node.name, &node.inputs, &mut issues);
            resolved_count += node.resolved.iter().flatten().count();
        }
        if !issues.is_empty() {
            return issues;
        }

        for node in &mut self.nodes {
            let resolved = node.resolved.clone();
            if let Some(sd) = node.model.as_state_dependency_mut() {
                if let Err(e) = sd.set_input_value_refs(resolved) {
                    issues.extend(e.into_issues(&node.name));
                }
            }
        }
        tracing::info!(resolved = resolved_count, "input references resolved");
        issues
    }

    fn collect_dependencies(&mut self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let strict = self.config.strict_dependencies;
        for node in &mut self.nodes {
            let Some(sd) = node.model.as_state_dependency() else {
                continue;
            };
            let ranges = node.result_ranges();
            let owns = |r: ValueRef| ranges.iter().any(|range| range.contains(r));
            let variable_inputs: Vec<(usize, ValueRange)> = node
                .resolved
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.filter(|r| !r.constant).map(|r| (i, r.range)))
                .collect();

            let edges = match sd.state_dependencies() {
                None => dense_edges(&ranges, variable_inputs.iter().map(|(_, r)| *r)),
                Some(mut pairs) => {
                    for (result, _) in &pairs {
                        if !owns(*result) {
                            issues.push(ConfigIssue::new(
                                &node.name,
                                format!("declares a dependency for result slot {} it does not own", result),
                            ));
                        }
                    }
                    for (i, range) in &variable_inputs {
                        let covered = pairs.iter().any(|(_, input)| range.contains(*input));
                        if covered {
                            continue;
                        }
                        let reference = &node.inputs[*i];
                        if strict {
                            issues.push(ConfigIssue::new(
                                &node.name,
                                format!("input {} is missing from its state dependencies", reference),
                            ));
                        } else {
                            tracing::warn!(
                                model = %node.name,
                                input = %reference,
                                "input missing from state dependencies; assuming all results depend on it"
                            );
                            pairs.extend(dense_edges(&ranges, std::iter::once(*range)));
                        }
                    }
                    pairs
                }
            };
            tracing::debug!(model = %node.name, edges = edges.len(), "state dependencies");
            node.edges = edges;
        }
        issues
    }

    /// Refresh time-dependent models. Repeated calls with the same `t` do nothing.
    pub fn set_time(&mut self, t: f64) -> Result<(), EvalError> {
        if !self.initialized {
            return Err(EvalError::Lifecycle {
                what: "set_time before initialize",
            });
        }
        if self.time == Some(t) {
            return Ok(());
        }
        for node in &mut self.nodes {
            if let Some(td) = node.model.as_time_dependency_mut() {
                td.set_time(t, &self.store)
                    .map_err(|e| EvalError::from_update(&node.name, e))?;
            }
        }
        self.time = Some(t);
        Ok(())
    }

    pub fn current_time(&self) -> Option<f64> {
        self.time
    }

    /// One scheduler pass over all groups.
    ///
    /// The first failing group in schedule order aborts the pass, in parallel mode as well.
    /// No retries happen here; the caller decides what to do with recoverable errors.
    pub fn evaluate(&mut self) -> Result<EvalStats, EvalError> {
        if !self.initialized {
            return Err(EvalError::Lifecycle {
                what: "evaluate before initialize",
            });
        }
        let store = &self.store;
        let group_config = &self.config.group;
        let mut slots: Vec<Option<&mut ModelNode>> = self.nodes.iter_mut().map(Some).collect();
        let mut stats = EvalStats::default();

        if !self.config.parallel {
            for group in &self.schedule.groups {
                let mut members = take_members(&mut slots, group)?;
                stats.fixed_point_iterations +=
                    evaluate_group(group, &mut members, store, group_config)?;
                stats.groups += 1;
            }
            return Ok(stats);
        }

        // Report the failure a serial pass would hit: the one with the lowest schedule position.
        // Later levels still run their groups positioned before it.
        let mut failure: Option<(usize, EvalError)> = None;
        for level in &self.schedule.levels {
            let limit = failure.as_ref().map_or(usize::MAX, |(pos, _)| *pos);
            let mut jobs = Vec::with_capacity(level.len());
            for &gi in level.iter().filter(|&&gi| gi < limit) {
                let group = &self.schedule.groups[gi];
                jobs.push((gi, group, take_members(&mut slots, group)?));
            }
            if jobs.is_empty() {
                continue;
            }
            let outcomes: Vec<(usize, Result<usize, EvalError>)> = jobs
                .into_par_iter()
                .map(|(gi, group, mut members)| {
                    (gi, evaluate_group(group, &mut members, store, group_config))
                })
                .collect();
            for (gi, outcome) in outcomes {
                match outcome {
                    Ok(iterations) => {
                        stats.fixed_point_iterations += iterations;
                        stats.groups += 1;
                    }
                    Err(e) => {
                        let earlier_wins = failure.as_ref().is_some_and(|(pos, _)| *pos < gi);
                        if earlier_wins {
                            report_superseded(&e);
                        } else if let Some((_, later)) = failure.replace((gi, e)) {
                            report_superseded(&later);
                        }
                    }
                }
            }
        }
        match failure {
            Some((_, e)) => Err(e),
            None => Ok(stats),
        }
    }

    /// The step ending at `t` was accepted: let models commit persistent state.
    pub fn step_completed(&mut self, t: f64) {
        for node in &mut self.nodes {
            if let Some(td) = node.model.as_time_dependency_mut() {
                td.step_completed(t);
            }
        }
    }

    pub fn serialization_size(&self) -> usize {
        CHECKPOINT_MAGIC.len()
            + 4
            + self
                .nodes
                .iter()
                .map(|n| 4 + n.model.serialization_size())
                .sum::<usize>()
    }

    /// Checkpoint image: per-model blobs concatenated in registration order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialization_size());
        buf.extend_from_slice(CHECKPOINT_MAGIC);
        buf.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        let mut blob = Vec::new();
        for node in &self.nodes {
            blob.clear();
            node.model.serialize(&mut blob);
            if blob.len() != node.model.serialization_size() {
                tracing::warn!(
                    model = %node.name,
                    written = blob.len(),
                    announced = node.model.serialization_size(),
                    "restart blob size differs from announced size"
                );
            }
            buf.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            buf.extend_from_slice(&blob);
        }
        buf
    }

    /// Restore a checkpoint image written by an engine with the same model setup.
    ///
    /// The image is validated as a whole before any model sees its blob. If a model rejects
    /// its blob, models already restored get their previous state back and the engine is left
    /// as it was before the call.
    pub fn deserialize(&mut self, image: &[u8]) -> ModelResult<()> {
        let blobs = self.split_image(image)?;
        let saved: Vec<Vec<u8>> = self
            .nodes
            .iter()
            .map(|node| {
                let mut blob = Vec::with_capacity(node.model.serialization_size());
                node.model.serialize(&mut blob);
                blob
            })
            .collect();

        let mut failure = None;
        for (i, (node, blob)) in self.nodes.iter_mut().zip(&blobs).enumerate() {
            if let Err(e) = node.model.deserialize(blob) {
                failure = Some((i, e));
                break;
            }
        }
        if let Some((failed, e)) = failure {
            for (node, blob) in self.nodes.iter_mut().zip(&saved).take(failed + 1) {
                if let Err(restore) = node.model.deserialize(blob) {
                    tracing::error!(
                        model = %node.name,
                        error = %restore,
                        "could not put back state after a rejected checkpoint"
                    );
                }
            }
            return Err(e);
        }
        self.time = None;
        Ok(())
    }

    /// Split an image into per-model blobs, checking header, sizes and trailing bytes.
    fn split_image<'a>(&self, image: &'a [u8]) -> ModelResult<Vec<&'a [u8]>> {
        let corrupt = |what: String| ModelError::Checkpoint { what };
        let rest = image
            .strip_prefix(CHECKPOINT_MAGIC.as_slice())
            .ok_or_else(|| corrupt("missing checkpoint header".into()))?;
        let (count, mut rest) = split_u32(rest).ok_or_else(|| corrupt("truncated header".into()))?;
        if count as usize != self.nodes.len() {
            return Err(corrupt(format!(
                "image holds {} models, engine has {}",
                count,
                self.nodes.len()
            )));
        }
        let mut blobs = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let (len, tail) = split_u32(rest)
                .ok_or_else(|| corrupt(format!("truncated before {}", node.name)))?;
            let len = len as usize;
            if len != node.model.serialization_size() || tail.len() < len {
                return Err(corrupt(format!(
                    "blob of {} has {} bytes, expected {}",
                    node.name,
                    len,
                    node.model.serialization_size()
                )));
            }
            let (blob, tail) = tail.split_at(len);
            blobs.push(blob);
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(corrupt(format!("{} trailing bytes", rest.len())));
        }
        Ok(blobs)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Schedule listing with model names, for diagnostics.
    pub fn describe_schedule(&self) -> String {
        let mut out = String::new();
        for (i, g) in self.schedule.groups.iter().enumerate() {
            let names: Vec<&str> = g
                .sequence
                .iter()
                .filter_map(|n| self.node_name(*n))
                .collect();
            out.push_str(&format!(
                "{:>3} L{} {:?} {:?}: {}\n",
                i,
                g.level,
                g.tier,
                g.kind,
                names.join(" -> ")
            ));
        }
        out
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn value(&self, r: ValueRef) -> f64 {
        self.store.get(r)
    }

    /// Write a slot from outside (integrator states, external inputs).
    pub fn set_value(&self, r: ValueRef, value: f64) {
        self.store.set(r, value);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, idx: NodeIdx) -> Option<&str> {
        self.nodes.get(idx.index()).map(|n| n.name.as_str())
    }

    pub fn find_node(&self, reference_type: ReferenceType, id: ObjectId) -> Option<NodeIdx> {
        self.nodes
            .iter()
            .find(|n| n.model.reference_type() == reference_type && n.model.id() == id)
            .map(|n| n.idx)
    }

    pub fn result_descriptions(&self, idx: NodeIdx) -> Vec<QuantityDescription> {
        self.nodes
            .get(idx.index())
            .map(|n| n.results.iter().map(|(d, _)| d.clone()).collect())
            .unwrap_or_default()
    }

    /// Slot range of a node's result; indexed names select one vector element.
    pub fn result_value_ref(&self, idx: NodeIdx, name: &QuantityName) -> Option<ValueRange> {
        let node = self.nodes.get(idx.index())?;
        let (description, range) = node.results.iter().find(|(d, _)| d.name == name.name)?;
        match name.index {
            None => Some(*range),
            Some(key) => {
                let pos = description.position_of(key)?;
                range.get(pos).map(ValueRange::scalar)
            }
        }
    }

    /// Resolve a reference the same way model inputs are resolved.
    pub fn find_result(&self, reference: &InputReference) -> Option<ValueRange> {
        self.index.lookup(reference).map(|(_, r)| r.range)
    }

    /// Declared inputs of a node with their resolution, for introspection.
    pub fn inputs(&self, idx: NodeIdx) -> Vec<(InputReference, Option<ValueRange>)> {
        self.nodes
            .get(idx.index())
            .map(|n| {
                n.inputs
                    .iter()
                    .cloned()
                    .zip(n.resolved.iter().map(|r| r.map(|r| r.range)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All dependency pairs of a node.
    pub fn dependencies(&self, idx: NodeIdx) -> &[DependencyPair] {
        self.nodes
            .get(idx.index())
            .map(|n| n.edges.as_slice())
            .unwrap_or(&[])
    }
}

fn dense_edges(
    results: &[ValueRange],
    inputs: impl Iterator<Item = ValueRange>,
) -> Vec<DependencyPair> {
    let input_slots: BTreeSet<ValueRef> = inputs.flat_map(|r| r.iter()).collect();
    results
        .iter()
        .flat_map(|r| r.iter())
        .flat_map(|r| input_slots.iter().map(move |i| (r, *i)))
        .collect()
}

/// An error that lost to one from an earlier group in the same parallel pass.
fn report_superseded(e: &EvalError) {
    if e.is_recoverable() {
        tracing::debug!(error = %e, "error superseded by an earlier group");
    } else {
        tracing::warn!(error = %e, "fatal error superseded by an earlier group");
    }
}

fn take_members<'a>(
    slots: &mut [Option<&'a mut ModelNode>],
    group: &EvaluationGroup,
) -> Result<Vec<&'a mut ModelNode>, EvalError> {
    group
        .members
        .iter()
        .map(|m| {
            slots
                .get_mut(m.index())
                .and_then(Option::take)
                .ok_or(EvalError::Lifecycle {
                    what: "node scheduled in more than one group",
                })
        })
        .collect()
}

fn split_u32(buf: &[u8]) -> Option<(u32, &[u8])> {
    let (head, tail) = buf.split_first_chunk::<4>()?;
    Some((u32::from_le_bytes(*head), tail))
}
