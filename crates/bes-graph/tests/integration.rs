//! Integration tests for bes-graph.

use bes_core::{NodeIdx, ValueRange, ValueRef};
use bes_graph::{DependencyGraphBuilder, GroupKind, PRIORITY_OFFSET_TAIL, Schedule, Tier};
use proptest::prelude::*;

fn slot(i: u32) -> ValueRef {
    ValueRef::from_index(i)
}

fn position(schedule: &Schedule, node: NodeIdx) -> usize {
    schedule.group_of(node).unwrap()
}

#[test]
fn ring_of_three_is_one_cyclic_group() {
    // A <- B <- C <- A
    let mut b = DependencyGraphBuilder::new();
    for i in 0..3 {
        b.add_node(NodeIdx(i), format!("n{i}"), None, vec![ValueRange::scalar(slot(i))]);
    }
    b.add_edge(NodeIdx(0), slot(0), slot(1));
    b.add_edge(NodeIdx(1), slot(1), slot(2));
    b.add_edge(NodeIdx(2), slot(2), slot(0));
    let s = b.build().unwrap();

    assert_eq!(s.groups.len(), 1);
    assert_eq!(s.groups[0].kind, GroupKind::Cyclic);
    assert_eq!(s.groups[0].members, vec![NodeIdx(0), NodeIdx(1), NodeIdx(2)]);
}

#[test]
fn node_cycle_without_value_cycle_is_sequential() {
    // Node 0 owns slots 0 and 1, node 1 owns slot 2.
    // slot 2 <- slot 0, slot 1 <- slot 2: nodes depend on each other, values do not.
    let mut b = DependencyGraphBuilder::new();
    b.add_node(NodeIdx(0), "zone", None, vec![ValueRange::new(slot(0), 2)]);
    b.add_node(NodeIdx(1), "controller", None, vec![ValueRange::scalar(slot(2))]);
    b.add_edge(NodeIdx(1), slot(2), slot(0));
    b.add_edge(NodeIdx(0), slot(1), slot(2));
    let s = b.build().unwrap();

    assert_eq!(s.groups.len(), 1);
    let g = &s.groups[0];
    assert_eq!(g.kind, GroupKind::Sequential);
    assert_eq!(g.sequence, vec![NodeIdx(0), NodeIdx(1), NodeIdx(0)]);
}

#[test]
fn tail_priority_runs_after_independent_nodes() {
    let mut b = DependencyGraphBuilder::new();
    b.add_node(
        NodeIdx(0),
        "late",
        Some(PRIORITY_OFFSET_TAIL + 10),
        vec![ValueRange::scalar(slot(0))],
    );
    b.add_node(NodeIdx(1), "plain", None, vec![ValueRange::scalar(slot(1))]);
    b.add_node(NodeIdx(2), "early", Some(5), vec![ValueRange::scalar(slot(2))]);
    let s = b.build().unwrap();

    assert_eq!(s.flat_order(), vec![NodeIdx(2), NodeIdx(1), NodeIdx(0)]);
    assert_eq!(s.groups[2].tier, Tier::Tail);
    // the tail group is split off into its own level
    assert_eq!(s.levels, vec![vec![0, 1], vec![2]]);
}

#[test]
fn dependency_beats_tail_priority() {
    let mut b = DependencyGraphBuilder::new();
    b.add_node(NodeIdx(0), "consumer", None, vec![ValueRange::scalar(slot(0))]);
    b.add_node(
        NodeIdx(1),
        "late producer",
        Some(PRIORITY_OFFSET_TAIL),
        vec![ValueRange::scalar(slot(1))],
    );
    b.add_edge(NodeIdx(0), slot(0), slot(1));
    let s = b.build().unwrap();
    assert_eq!(s.flat_order(), vec![NodeIdx(1), NodeIdx(0)]);
}

#[test]
fn schedule_is_deterministic() {
    let build = || {
        let mut b = DependencyGraphBuilder::new();
        for i in 0..6 {
            b.add_node(NodeIdx(i), format!("n{i}"), None, vec![ValueRange::scalar(slot(i))]);
        }
        b.add_edge(NodeIdx(5), slot(5), slot(0));
        b.add_edge(NodeIdx(3), slot(3), slot(4));
        b.add_edge(NodeIdx(4), slot(4), slot(3));
        b.build().unwrap()
    };
    assert_eq!(build(), build());
}

proptest! {
    /// Every cross-group edge points forward in the schedule, and every node is scheduled once.
    #[test]
    fn random_graphs_schedule_validly(
        n in 1_u32..12,
        raw_edges in prop::collection::vec((0_u32..12, 0_u32..12), 0..30),
    ) {
        let mut b = DependencyGraphBuilder::new();
        for i in 0..n {
            b.add_node(NodeIdx(i), format!("n{i}"), None, vec![ValueRange::scalar(slot(i))]);
        }
        let edges: Vec<(u32, u32)> = raw_edges
            .into_iter()
            .filter(|(c, p)| *c < n && *p < n)
            .collect();
        for &(consumer, producer) in &edges {
            b.add_edge(NodeIdx(consumer), slot(consumer), slot(producer));
        }
        let s = b.build().unwrap();

        let mut seen: Vec<NodeIdx> = s.groups.iter().flat_map(|g| g.members.clone()).collect();
        seen.sort();
        prop_assert_eq!(seen, (0..n).map(NodeIdx).collect::<Vec<_>>());

        for &(consumer, producer) in &edges {
            let (gc, gp) = (position(&s, NodeIdx(consumer)), position(&s, NodeIdx(producer)));
            if gc != gp {
                prop_assert!(gp < gc);
                prop_assert!(s.groups[gp].level < s.groups[gc].level);
            } else if consumer != producer {
                // scalar nodes: a node-level cycle is always a value cycle
                prop_assert_eq!(s.groups[gc].kind, GroupKind::Cyclic);
            }
        }
    }
    /// Nodes publishing several values: running a sequential group's sequence once leaves
    /// every value computed from final inputs.
    #[test]
    fn random_multi_value_graphs_schedule_validly(
        sizes in prop::collection::vec(1_u32..=3, 1..8),
        raw_edges in prop::collection::vec((0_usize..8, 0_u32..3, 0_usize..8, 0_u32..3), 0..24),
    ) {
        let n = sizes.len();
        let mut starts = Vec::with_capacity(n);
        let mut owner = Vec::new();
        for (i, &size) in sizes.iter().enumerate() {
            starts.push(owner.len() as u32);
            owner.extend(std::iter::repeat_n(i, size as usize));
        }
        let mut b = DependencyGraphBuilder::new();
        for i in 0..n {
            b.add_node(
                NodeIdx(i as u32),
                format!("n{i}"),
                None,
                vec![ValueRange::new(slot(starts[i]), sizes[i])],
            );
        }
        // (consumer slot, producer slot) between different nodes
        let edges: Vec<(u32, u32)> = raw_edges
            .into_iter()
            .filter(|(c, _, p, _)| *c < n && *p < n && c != p)
            .map(|(c, cs, p, ps)| (starts[c] + cs % sizes[c], starts[p] + ps % sizes[p]))
            .collect();
        for &(result, input) in &edges {
            b.add_edge(NodeIdx(owner[result as usize] as u32), slot(result), slot(input));
        }
        let s = b.build().unwrap();

        let mut seen: Vec<NodeIdx> = s.groups.iter().flat_map(|g| g.members.clone()).collect();
        seen.sort();
        prop_assert_eq!(seen, (0..n as u32).map(NodeIdx).collect::<Vec<_>>());

        for &(result, input) in &edges {
            let consumer = NodeIdx(owner[result as usize] as u32);
            let producer = NodeIdx(owner[input as usize] as u32);
            let (gc, gp) = (position(&s, consumer), position(&s, producer));
            if gc != gp {
                prop_assert!(gp < gc);
                prop_assert!(s.groups[gp].level < s.groups[gc].level);
            }
        }

        for g in s.groups.iter().filter(|g| g.kind == GroupKind::Sequential) {
            let in_group = |slot: u32| g.members.contains(&NodeIdx(owner[slot as usize] as u32));
            let mut settled = vec![false; owner.len()];
            for node in &g.sequence {
                prop_assert!(g.members.contains(node));
                let i = node.0 as usize;
                for own in starts[i]..starts[i] + sizes[i] {
                    let ready = edges
                        .iter()
                        .filter(|(result, input)| *result == own && in_group(*input))
                        .all(|(_, input)| settled[*input as usize]);
                    settled[own as usize] = ready;
                }
            }
            for member in &g.members {
                let i = member.0 as usize;
                for own in starts[i]..starts[i] + sizes[i] {
                    prop_assert!(settled[own as usize], "slot {} of {:?} not settled", own, g);
                }
            }
        }
    }
}
