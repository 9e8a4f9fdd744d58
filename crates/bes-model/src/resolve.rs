//! Input reference resolution.
//!
//! Published results are indexed once by [`ResultKey`] in three stages (overrides,
//! regular results, schedules). Resolving an [`InputReference`] is a lookup in that order,
//! followed by element selection for indexed references into vector quantities.

use std::collections::BTreeMap;

use bes_core::{InputReference, NodeIdx, QuantityDescription, ResultKey, ValueRange};

use crate::capability::{LookupStage, ResolvedInput};
use crate::error::ConfigIssue;

/// A published quantity as stored in the index.
#[derive(Clone, Debug, PartialEq)]
pub struct Published {
    pub node: NodeIdx,
    pub description: QuantityDescription,
    pub range: ValueRange,
}

#[derive(Clone, Debug, Default)]
pub struct ResultIndex {
    overrides: BTreeMap<ResultKey, Published>,
    regular: BTreeMap<ResultKey, Published>,
    schedules: BTreeMap<ResultKey, Published>,
}

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn stage_mut(&mut self, stage: LookupStage) -> &mut BTreeMap<ResultKey, Published> {
        match stage {
            LookupStage::Override => &mut self.overrides,
            LookupStage::Regular => &mut self.regular,
            LookupStage::Schedule => &mut self.schedules,
        }
    }

    /// Add a published key. Two producers of one key within a stage is a configuration error.
    pub fn insert(
        &mut self,
        stage: LookupStage,
        key: ResultKey,
        published: Published,
    ) -> Result<(), ConfigIssue> {
        let map = self.stage_mut(stage);
        if let Some(existing) = map.get(&key) {
            return Err(ConfigIssue::new(
                key.to_string(),
                format!(
                    "published twice (nodes {} and {})",
                    existing.node, published.node
                ),
            ));
        }
        map.insert(key, published);
        Ok(())
    }

    /// The producer of a key, honouring stage precedence.
    pub fn find(&self, key: &ResultKey) -> Option<&Published> {
        self.overrides
            .get(key)
            .or_else(|| self.regular.get(key))
            .or_else(|| self.schedules.get(key))
    }

    /// Resolve one reference to a value range.
    ///
    /// Unindexed references to vectors resolve to the whole range; indexed references
    /// select one element by key. An index into a scalar never resolves.
    pub fn lookup(&self, reference: &InputReference) -> Option<(NodeIdx, ResolvedInput)> {
        let published = self.find(&reference.result_key())?;
        let range = match reference.name.index {
            None => published.range,
            Some(key) => {
                let pos = published.description.position_of(key)?;
                ValueRange::scalar(published.range.get(pos)?)
            }
        };
        Some((
            published.node,
            ResolvedInput {
                range,
                constant: published.description.constant,
            },
        ))
    }

    pub fn len(&self) -> usize {
        self.overrides.len() + self.regular.len() + self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All regular and override keys, for diagnostics.
    pub fn keys(&self) -> impl Iterator<Item = &ResultKey> {
        self.overrides
            .keys()
            .chain(self.regular.keys())
            .chain(self.schedules.keys())
    }
}

/// Resolve the declared inputs of one model, preserving declaration order.
///
/// Unresolved required references are appended to `issues`; unresolved optional ones
/// yield `None`.
pub fn resolve_inputs(
    index: &ResultIndex,
    consumer: &str,
    references: &[InputReference],
    issues: &mut Vec<ConfigIssue>,
) -> Vec<Option<ResolvedInput>> {
    references
        .iter()
        .map(|r| match index.lookup(r) {
            Some((_, resolved)) => Some(resolved),
            None if r.required => {
                issues.push(ConfigIssue::new(
                    consumer,
                    format!("required input {} has no producer", r),
                ));
                None
            }
            None => {
                tracing::debug!(model = consumer, input = %r, "optional input not available");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bes_core::{IndexKeyType, QuantityName, ReferenceType, ValueRef};

    fn published(node: u32, start: u32, description: QuantityDescription) -> Published {
        Published {
            node: NodeIdx(node),
            range: ValueRange::new(ValueRef::from_index(start), description.len()),
            description,
        }
    }

    fn key(rt: ReferenceType, id: u32, name: &str) -> ResultKey {
        ResultKey {
            reference_type: rt,
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn override_beats_regular_beats_schedule() {
        let mut index = ResultIndex::new();
        let k = key(ReferenceType::Zone, 1, "HeatingSetpointSchedule");
        let d = QuantityDescription::scalar("HeatingSetpointSchedule", "K", "", false);
        index
            .insert(LookupStage::Schedule, k.clone(), published(0, 0, d.clone()))
            .unwrap();
        assert_eq!(index.find(&k).unwrap().node, NodeIdx(0));
        index
            .insert(LookupStage::Regular, k.clone(), published(1, 1, d.clone()))
            .unwrap();
        assert_eq!(index.find(&k).unwrap().node, NodeIdx(1));
        index
            .insert(LookupStage::Override, k.clone(), published(2, 2, d))
            .unwrap();
        assert_eq!(index.find(&k).unwrap().node, NodeIdx(2));
    }

    #[test]
    fn duplicate_in_stage_rejected() {
        let mut index = ResultIndex::new();
        let k = key(ReferenceType::Zone, 1, "AirTemperature");
        let d = QuantityDescription::scalar("AirTemperature", "K", "", false);
        index
            .insert(LookupStage::Regular, k.clone(), published(0, 0, d.clone()))
            .unwrap();
        assert!(index.insert(LookupStage::Regular, k, published(1, 1, d)).is_err());
    }

    #[test]
    fn vector_element_by_object_id() {
        let mut index = ResultIndex::new();
        let d = QuantityDescription::vector(
            "VentilationHeatFlux",
            "W",
            "",
            false,
            IndexKeyType::ObjectId,
            vec![3, 7, 9],
        );
        index
            .insert(
                LookupStage::Regular,
                key(ReferenceType::Model, 5, "VentilationHeatFlux"),
                published(0, 10, d),
            )
            .unwrap();

        let elem = InputReference::required(
            ReferenceType::Model,
            5,
            QuantityName::indexed("VentilationHeatFlux", 7),
        );
        let (_, r) = index.lookup(&elem).unwrap();
        assert_eq!(r.range, ValueRange::scalar(ValueRef::from_index(11)));

        let whole = InputReference::required(
            ReferenceType::Model,
            5,
            QuantityName::new("VentilationHeatFlux"),
        );
        assert_eq!(index.lookup(&whole).unwrap().1.range.len, 3);

        let missing = InputReference::required(
            ReferenceType::Model,
            5,
            QuantityName::indexed("VentilationHeatFlux", 4),
        );
        assert!(index.lookup(&missing).is_none());
    }

    #[test]
    fn required_missing_is_reported_optional_is_none() {
        let index = ResultIndex::new();
        let refs = vec![
            InputReference::required(ReferenceType::Zone, 1, QuantityName::new("AirTemperature")),
            InputReference::optional(ReferenceType::Zone, 2, QuantityName::new("AirTemperature")),
        ];
        let mut issues = Vec::new();
        let resolved = resolve_inputs(&index, "consumer", &refs, &mut issues);
        assert_eq!(resolved, vec![None, None]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].what.contains("Zone(id=1).AirTemperature"));
    }
}
