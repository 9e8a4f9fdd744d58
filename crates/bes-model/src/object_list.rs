//! Object lists: named id filters over one reference type.
//!
//! Filters are parsed from text such as `1,4,10-20` or `*`. Resolution intersects the
//! filter with the ids registered for the reference type and returns them ordered and
//! deduplicated.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use bes_core::{ObjectId, ReferenceType};

use crate::error::{ModelError, ModelResult, ObjectListError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdFilter {
    All,
    /// Explicit ids plus closed intervals.
    Ids {
        ids: BTreeSet<ObjectId>,
        intervals: Vec<(ObjectId, ObjectId)>,
    },
}

impl IdFilter {
    pub fn ids(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        IdFilter::Ids {
            ids: ids.into_iter().collect(),
            intervals: Vec::new(),
        }
    }

    pub fn matches(&self, id: ObjectId) -> bool {
        match self {
            IdFilter::All => true,
            IdFilter::Ids { ids, intervals } => {
                ids.contains(&id) || intervals.iter().any(|(lo, hi)| (*lo..=*hi).contains(&id))
            }
        }
    }
}

impl FromStr for IdFilter {
    type Err = ObjectListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" || s.eq_ignore_ascii_case("all") {
            return Ok(IdFilter::All);
        }
        let syntax = || ObjectListError::Syntax {
            text: s.to_string(),
        };
        let mut ids = BTreeSet::new();
        let mut intervals = Vec::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('-') {
                Some((lo, hi)) => {
                    let lo: ObjectId = lo.trim().parse().map_err(|_| syntax())?;
                    let hi: ObjectId = hi.trim().parse().map_err(|_| syntax())?;
                    if lo == 0 {
                        return Err(ObjectListError::ZeroInInterval { lo, hi });
                    }
                    if hi < lo {
                        return Err(ObjectListError::ReversedInterval { lo, hi });
                    }
                    intervals.push((lo, hi));
                }
                None => {
                    ids.insert(token.parse().map_err(|_| syntax())?);
                }
            }
        }
        if ids.is_empty() && intervals.is_empty() {
            return Err(ObjectListError::Empty);
        }
        Ok(IdFilter::Ids { ids, intervals })
    }
}

/// Ids of all registered physical objects, per reference type.
#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    ids: BTreeMap<ReferenceType, BTreeSet<ObjectId>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the id was already registered for this type.
    pub fn register(&mut self, reference_type: ReferenceType, id: ObjectId) -> bool {
        self.ids.entry(reference_type).or_default().insert(id)
    }

    pub fn ids_of(&self, reference_type: ReferenceType) -> impl Iterator<Item = ObjectId> + '_ {
        self.ids
            .get(&reference_type)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    pub fn contains(&self, reference_type: ReferenceType, id: ObjectId) -> bool {
        self.ids
            .get(&reference_type)
            .is_some_and(|s| s.contains(&id))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectList {
    pub name: String,
    pub reference_type: ReferenceType,
    pub filter: IdFilter,
}

impl ObjectList {
    pub fn new(name: impl Into<String>, reference_type: ReferenceType, filter: IdFilter) -> Self {
        Self {
            name: name.into(),
            reference_type,
            filter,
        }
    }

    /// Parse the filter text and build the list.
    pub fn parse(
        name: impl Into<String>,
        reference_type: ReferenceType,
        filter: &str,
    ) -> ModelResult<Self> {
        let name = name.into();
        let filter = filter.parse().map_err(|source| ModelError::ObjectList {
            list: name.clone(),
            source,
        })?;
        Ok(Self::new(name, reference_type, filter))
    }

    /// Concrete ids selected by this list, ascending and unique.
    ///
    /// Location and Schedule lists always yield id 0. An empty selection is not an error;
    /// the owning model simply contributes nothing.
    pub fn resolve(&self, registry: &ObjectRegistry) -> Vec<ObjectId> {
        if self.reference_type.is_singleton() {
            return vec![0];
        }
        let selected: Vec<ObjectId> = registry
            .ids_of(self.reference_type)
            .filter(|id| self.filter.matches(*id))
            .collect();

        if let IdFilter::Ids { ids, .. } = &self.filter {
            let unknown: Vec<_> = ids
                .iter()
                .filter(|id| !registry.contains(self.reference_type, **id))
                .collect();
            if !unknown.is_empty() {
                tracing::warn!(
                    list = %self.name,
                    "object list names unknown {} ids {:?}; they are ignored",
                    self.reference_type,
                    unknown
                );
            }
        }
        if selected.is_empty() {
            tracing::warn!(
                list = %self.name,
                "object list selects no {} objects",
                self.reference_type
            );
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry(zones: &[ObjectId]) -> ObjectRegistry {
        let mut r = ObjectRegistry::new();
        for z in zones {
            r.register(ReferenceType::Zone, *z);
        }
        r
    }

    #[test]
    fn parse_ids_and_intervals() {
        let f: IdFilter = "3, 1, 10-12".parse().unwrap();
        assert!(f.matches(1) && f.matches(11) && !f.matches(2));
        assert_eq!("*".parse::<IdFilter>().unwrap(), IdFilter::All);
    }

    #[test]
    fn parse_rejects_bad_intervals() {
        assert_eq!(
            "0-5".parse::<IdFilter>(),
            Err(ObjectListError::ZeroInInterval { lo: 0, hi: 5 })
        );
        assert_eq!(
            "9-2".parse::<IdFilter>(),
            Err(ObjectListError::ReversedInterval { lo: 9, hi: 2 })
        );
        assert!(matches!("a-b".parse::<IdFilter>(), Err(ObjectListError::Syntax { .. })));
        assert_eq!(" , ".parse::<IdFilter>(), Err(ObjectListError::Empty));
    }

    #[test]
    fn resolve_intersects_registered_ids() {
        let reg = registry(&[1, 2, 5, 7]);
        let list = ObjectList::parse("some zones", ReferenceType::Zone, "2,3,5-9").unwrap();
        assert_eq!(list.resolve(&reg), vec![2, 5, 7]);

        let all = ObjectList::new("all zones", ReferenceType::Zone, IdFilter::All);
        assert_eq!(all.resolve(&reg), vec![1, 2, 5, 7]);
    }

    #[test]
    fn singleton_lists_resolve_to_zero() {
        let list = ObjectList::new("ambient", ReferenceType::Location, IdFilter::All);
        assert_eq!(list.resolve(&ObjectRegistry::new()), vec![0]);
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let list = ObjectList::parse("none", ReferenceType::Zone, "40").unwrap();
        assert!(list.resolve(&registry(&[1])).is_empty());
    }

    proptest! {
        #[test]
        fn resolved_ids_sorted_unique_and_registered(
            zones in prop::collection::vec(1_u32..50, 0..20),
            picks in prop::collection::vec(1_u32..60, 1..10),
        ) {
            let reg = registry(&zones);
            let list = ObjectList::new("p", ReferenceType::Zone, IdFilter::ids(picks.clone()));
            let ids = list.resolve(&reg);
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in &ids {
                prop_assert!(zones.contains(id) && picks.contains(id));
            }
        }
    }
}
