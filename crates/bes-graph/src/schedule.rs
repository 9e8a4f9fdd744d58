//! The evaluation schedule produced by [`crate::DependencyGraphBuilder::build`].

use std::fmt;

use bes_core::NodeIdx;

/// Priorities at or above this value are evaluated after all regular nodes.
pub const PRIORITY_OFFSET_TAIL: u32 = 100;

/// Coarse ordering band of a group.
///
/// Head groups (explicit priority below [`PRIORITY_OFFSET_TAIL`]) are preferred over
/// unprioritized ones, which are preferred over tail groups. Dependencies always win.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Head,
    Normal,
    Tail,
}

impl Tier {
    pub fn from_priority(priority: Option<u32>) -> Self {
        match priority {
            None => Tier::Normal,
            Some(p) if p >= PRIORITY_OFFSET_TAIL => Tier::Tail,
            Some(_) => Tier::Head,
        }
    }
}

/// How the members of a group are evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// One node, evaluated once.
    Single,
    /// A node-level cycle without a slot-level cycle: one ordered pass over
    /// [`EvaluationGroup::sequence`] (a node may appear more than once).
    Sequential,
    /// A true value cycle: members are iterated to a fixed point.
    Cyclic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationGroup {
    pub kind: GroupKind,
    /// Members in registration order.
    pub members: Vec<NodeIdx>,
    /// Evaluation order of one pass. Equals `members` except for sequential groups.
    pub sequence: Vec<NodeIdx>,
    pub tier: Tier,
    /// Largest explicit priority among the members.
    pub priority: Option<u32>,
    /// Parallel level; groups sharing a level do not depend on each other.
    pub level: usize,
}

impl EvaluationGroup {
    pub fn contains(&self, node: NodeIdx) -> bool {
        self.members.binary_search(&node).is_ok()
    }
}

/// Ordered list of evaluation groups plus their partition into parallel levels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub groups: Vec<EvaluationGroup>,
    /// `levels[l]` lists indices into `groups`, in schedule order.
    pub levels: Vec<Vec<usize>>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Index of the group containing `node`.
    pub fn group_of(&self, node: NodeIdx) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(node))
    }

    /// Flat node order of one serial pass (sequential groups may repeat nodes).
    pub fn flat_order(&self) -> Vec<NodeIdx> {
        self.groups
            .iter()
            .flat_map(|g| g.sequence.iter().copied())
            .collect()
    }

    pub fn cyclic_groups(&self) -> impl Iterator<Item = &EvaluationGroup> {
        self.groups.iter().filter(|g| g.kind == GroupKind::Cyclic)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, g) in self.groups.iter().enumerate() {
            let kind = match g.kind {
                GroupKind::Single => "single",
                GroupKind::Sequential => "sequential",
                GroupKind::Cyclic => "cyclic",
            };
            let seq: Vec<String> = g.sequence.iter().map(|n| n.to_string()).collect();
            write!(f, "{:>3} [L{} {:?}] {}: {}", i, g.level, g.tier, kind, seq.join(" -> "))?;
            if let Some(p) = g.priority {
                write!(f, " (priority {})", p)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
