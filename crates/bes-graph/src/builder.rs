//! Incremental dependency graph builder and scheduler.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use bes_core::{NodeIdx, ValueRange, ValueRef};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::error::{GraphError, GraphResult};
use crate::schedule::{EvaluationGroup, GroupKind, Schedule, Tier};
use crate::validate;

/// A state-dependent node as seen by the scheduler.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub idx: NodeIdx,
    pub name: String,
    pub priority: Option<u32>,
    /// Result slots owned (written) by this node.
    pub results: Vec<ValueRange>,
}

/// "`result` of `node` is computed from the value in `input`".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub node: NodeIdx,
    pub result: ValueRef,
    pub input: ValueRef,
}

/// Collects nodes and slot-level edges, then freezes them into a [`Schedule`].
///
/// Edges whose input slot is owned by no registered node (time-dependent models,
/// schedules, external inputs) impose no ordering and are kept only for cycle detection.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    nodes: Vec<NodeSpec>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Nodes should be added in registration order.
    pub fn add_node(
        &mut self,
        idx: NodeIdx,
        name: impl Into<String>,
        priority: Option<u32>,
        results: Vec<ValueRange>,
    ) {
        self.nodes.push(NodeSpec {
            idx,
            name: name.into(),
            priority,
            results,
        });
    }

    pub fn add_edge(&mut self, node: NodeIdx, result: ValueRef, input: ValueRef) {
        self.edges.push(DependencyEdge {
            node,
            result,
            input,
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Validate, detect cycles and order the evaluation groups.
    pub fn build(self) -> GraphResult<Schedule> {
        let owner = validate::validate_structure(&self.nodes, &self.edges)?;
        let priority: HashMap<NodeIdx, Option<u32>> =
            self.nodes.iter().map(|n| (n.idx, n.priority)).collect();

        // Slot graph: input -> result. Slots are inserted in ascending order so that
        // topological sorts are reproducible.
        let mut slot_graph: DiGraphMap<u32, ()> = DiGraphMap::new();
        let mut slots: BTreeSet<u32> = BTreeSet::new();
        for e in &self.edges {
            slots.insert(e.input.index());
            slots.insert(e.result.index());
        }
        for s in &slots {
            slot_graph.add_node(*s);
        }
        for e in &self.edges {
            slot_graph.add_edge(e.input.index(), e.result.index(), ());
        }

        // Slots taking part in a true value cycle
        let mut cyclic_owners: BTreeSet<NodeIdx> = BTreeSet::new();
        for scc in tarjan_scc(&slot_graph) {
            let is_cycle = scc.len() > 1 || slot_graph.contains_edge(scc[0], scc[0]);
            if is_cycle {
                for s in scc {
                    if let Some(&o) = owner.get(&ValueRef::from_index(s)) {
                        cyclic_owners.insert(o);
                    }
                }
            }
        }

        // Node graph: producer -> consumer
        let mut node_graph: DiGraphMap<NodeIdx, ()> = DiGraphMap::new();
        for n in &self.nodes {
            node_graph.add_node(n.idx);
        }
        for e in &self.edges {
            if let Some(&producer) = owner.get(&e.input) {
                if producer != e.node {
                    node_graph.add_edge(producer, e.node, ());
                }
            }
        }

        let mut comps: Vec<Vec<NodeIdx>> = tarjan_scc(&node_graph)
            .into_iter()
            .map(|mut c| {
                c.sort();
                c
            })
            .collect();
        comps.sort_by_key(|c| c[0]);

        let mut group_of: HashMap<NodeIdx, usize> = HashMap::new();
        let mut groups: Vec<EvaluationGroup> = Vec::with_capacity(comps.len());
        for (gi, members) in comps.into_iter().enumerate() {
            for m in &members {
                group_of.insert(*m, gi);
            }
            let cyclic = members.iter().any(|m| cyclic_owners.contains(m));
            let kind = if cyclic {
                GroupKind::Cyclic
            } else if members.len() > 1 {
                GroupKind::Sequential
            } else {
                GroupKind::Single
            };
            let sequence = match kind {
                GroupKind::Sequential => sequential_order(&members, &self.edges, &owner)?,
                _ => members.clone(),
            };
            let group_priority = members.iter().filter_map(|m| priority[m]).max();
            groups.push(EvaluationGroup {
                kind,
                sequence,
                tier: Tier::from_priority(group_priority),
                priority: group_priority,
                members,
                level: 0,
            });
        }

        // Condensed DAG
        let mut succ: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); groups.len()];
        let mut indegree = vec![0_usize; groups.len()];
        for (a, b, _) in node_graph.all_edges() {
            let (ga, gb) = (group_of[&a], group_of[&b]);
            if ga != gb && succ[ga].insert(gb) {
                indegree[gb] += 1;
            }
        }

        // Kahn with (tier, priority, first registered member) as tie-breaker
        let key = |g: &EvaluationGroup| (g.tier, g.priority.unwrap_or(0), g.members[0]);
        let mut ready = BinaryHeap::new();
        for (gi, g) in groups.iter().enumerate() {
            if indegree[gi] == 0 {
                ready.push(Reverse((key(g), gi)));
            }
        }
        let mut order = Vec::with_capacity(groups.len());
        while let Some(Reverse((_, gi))) = ready.pop() {
            order.push(gi);
            for &next in &succ[gi] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(Reverse((key(&groups[next]), next)));
                }
            }
        }
        if order.len() != groups.len() {
            return Err(GraphError::Inconsistent {
                what: "condensed graph still contains a cycle",
            });
        }

        for (gi, targets) in succ.iter().enumerate() {
            if groups[gi].tier == Tier::Tail {
                for &t in targets {
                    if groups[t].tier != Tier::Tail {
                        tracing::warn!(
                            "node(s) {:?} evaluate late but are inputs of node(s) {:?}; \
                             dependency order takes precedence",
                            groups[gi].members,
                            groups[t].members
                        );
                    }
                }
            }
        }

        // Parallel levels; tail groups start no earlier than after every group ordered before them
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
        for (gi, targets) in succ.iter().enumerate() {
            for &t in targets {
                preds[t].push(gi);
            }
        }
        let mut level = vec![0_usize; groups.len()];
        let mut max_level_seen: Option<usize> = None;
        let mut tail_barrier: Option<usize> = None;
        for &gi in &order {
            let mut l = preds[gi].iter().map(|&p| level[p] + 1).max().unwrap_or(0);
            if groups[gi].tier == Tier::Tail {
                let barrier =
                    *tail_barrier.get_or_insert_with(|| max_level_seen.map_or(0, |m| m + 1));
                l = l.max(barrier);
            }
            level[gi] = l;
            max_level_seen = Some(max_level_seen.map_or(l, |m| m.max(l)));
        }

        let mut by_level: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut ordered_groups = Vec::with_capacity(groups.len());
        let mut pending: Vec<Option<EvaluationGroup>> = groups.into_iter().map(Some).collect();
        for (pos, &gi) in order.iter().enumerate() {
            let Some(mut g) = pending[gi].take() else {
                return Err(GraphError::Inconsistent {
                    what: "group scheduled twice",
                });
            };
            g.level = level[gi];
            by_level.entry(g.level).or_default().push(pos);
            ordered_groups.push(g);
        }

        let schedule = Schedule {
            groups: ordered_groups,
            levels: by_level.into_values().collect(),
        };

        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            groups = schedule.groups.len(),
            cyclic = schedule.cyclic_groups().count(),
            levels = schedule.levels.len(),
            "dependency graph scheduled"
        );

        Ok(schedule)
    }
}

/// One ordered pass over a node-level cycle that has no slot-level cycle.
///
/// Slots owned by the members are sorted topologically; the owner sequence of that order,
/// with consecutive repeats collapsed, evaluates every result after all of its inputs.
fn sequential_order(
    members: &[NodeIdx],
    edges: &[DependencyEdge],
    owner: &HashMap<ValueRef, NodeIdx>,
) -> GraphResult<Vec<NodeIdx>> {
    let in_group = |s: ValueRef| owner.get(&s).is_some_and(|o| members.contains(o));

    let mut inner: Vec<(u32, u32)> = edges
        .iter()
        .filter(|e| in_group(e.input) && in_group(e.result))
        .map(|e| (e.input.index(), e.result.index()))
        .collect();
    inner.sort_unstable();

    let mut slots: BTreeSet<u32> = BTreeSet::new();
    for &(a, b) in &inner {
        slots.insert(a);
        slots.insert(b);
    }
    let mut g: DiGraphMap<u32, ()> = DiGraphMap::new();
    for s in &slots {
        g.add_node(*s);
    }
    for &(a, b) in &inner {
        g.add_edge(a, b, ());
    }

    let sorted = toposort(&g, None).map_err(|_| GraphError::Inconsistent {
        what: "sequential group contains a slot cycle",
    })?;

    let mut seq: Vec<NodeIdx> = Vec::new();
    for s in sorted {
        let Some(&o) = owner.get(&ValueRef::from_index(s)) else {
            continue;
        };
        if seq.last() != Some(&o) {
            seq.push(o);
        }
    }
    for m in members {
        if !seq.contains(m) {
            seq.push(*m);
        }
    }
    Ok(seq)
}
