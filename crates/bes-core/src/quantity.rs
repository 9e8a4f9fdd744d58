//! Quantity addressing: how a model result or input is named across the simulation.
//!
//! A published value is identified by the object that produces it
//! (`ReferenceType` + `ObjectId`) and by a [`QuantityName`]. Input references use the
//! same triple, so resolving an input is a key lookup.

use core::fmt;
use core::str::FromStr;

use crate::error::CoreError;
use crate::ids::ObjectId;

/// Kind of physical object a quantity is addressed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceType {
    Location,
    Zone,
    ConstructionInstance,
    EmbeddedObject,
    Model,
    Schedule,
    NetworkElement,
    Global,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 8] = [
        ReferenceType::Location,
        ReferenceType::Zone,
        ReferenceType::ConstructionInstance,
        ReferenceType::EmbeddedObject,
        ReferenceType::Model,
        ReferenceType::Schedule,
        ReferenceType::NetworkElement,
        ReferenceType::Global,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ReferenceType::Location => "Location",
            ReferenceType::Zone => "Zone",
            ReferenceType::ConstructionInstance => "ConstructionInstance",
            ReferenceType::EmbeddedObject => "EmbeddedObject",
            ReferenceType::Model => "Model",
            ReferenceType::Schedule => "Schedule",
            ReferenceType::NetworkElement => "NetworkElement",
            ReferenceType::Global => "Global",
        }
    }

    /// Location and Schedule objects exist once per project and always carry id 0.
    pub fn is_singleton(self) -> bool {
        matches!(self, ReferenceType::Location | ReferenceType::Schedule)
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ReferenceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceType::ALL
            .into_iter()
            .find(|rt| rt.keyword() == s)
            .ok_or_else(|| CoreError::UnknownReferenceType {
                name: s.to_string(),
            })
    }
}

/// Quantity name with optional vector index, e.g. `AirTemperature` or `HeatFlux[12]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantityName {
    pub name: String,
    pub index: Option<u32>,
}

impl QuantityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for QuantityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for QuantityName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| CoreError::MalformedReference {
            text: s.to_string(),
            reason,
        };
        let s_trim = s.trim();
        match s_trim.find('[') {
            None => {
                if s_trim.is_empty() {
                    return Err(malformed("empty quantity name"));
                }
                Ok(QuantityName::new(s_trim))
            }
            Some(open) => {
                let inner = s_trim[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| malformed("missing closing ']'"))?;
                let index = inner
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| malformed("vector index is not an unsigned integer"))?;
                let name = s_trim[..open].trim();
                if name.is_empty() {
                    return Err(malformed("empty quantity name"));
                }
                Ok(QuantityName::indexed(name, index))
            }
        }
    }
}

/// An input declared by a state-dependent model.
///
/// Equality and hashing ignore `required`: two declarations of the same source are the
/// same reference whether or not one of them is optional.
#[derive(Clone, Debug)]
pub struct InputReference {
    pub reference_type: ReferenceType,
    pub id: ObjectId,
    pub name: QuantityName,
    pub required: bool,
}

impl InputReference {
    pub fn required(reference_type: ReferenceType, id: ObjectId, name: QuantityName) -> Self {
        Self {
            reference_type,
            id,
            name,
            required: true,
        }
    }

    pub fn optional(reference_type: ReferenceType, id: ObjectId, name: QuantityName) -> Self {
        Self {
            reference_type,
            id,
            name,
            required: false,
        }
    }

    /// Key of the producing result, with the vector index dropped.
    pub fn result_key(&self) -> ResultKey {
        ResultKey {
            reference_type: self.reference_type,
            id: self.id,
            name: self.name.name.clone(),
        }
    }
}

impl PartialEq for InputReference {
    fn eq(&self, other: &Self) -> bool {
        self.reference_type == other.reference_type
            && self.id == other.id
            && self.name == other.name
    }
}

impl Eq for InputReference {}

impl core::hash::Hash for InputReference {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.reference_type.hash(state);
        self.id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for InputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={}).{}", self.reference_type, self.id, self.name)
    }
}

/// Parses the display form `Zone(id=12).AirTemperature[3]`. Parsed references are required.
impl FromStr for InputReference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| CoreError::MalformedReference {
            text: s.to_string(),
            reason,
        };
        let open = s.find("(id=").ok_or_else(|| malformed("expected '(id='"))?;
        let close = s[open..]
            .find(')')
            .map(|c| c + open)
            .ok_or_else(|| malformed("expected ')'"))?;
        let reference_type: ReferenceType = s[..open].trim().parse()?;
        let id = s[open + 4..close]
            .trim()
            .parse::<ObjectId>()
            .map_err(|_| malformed("object id is not an unsigned integer"))?;
        let rest = s[close + 1..]
            .strip_prefix('.')
            .ok_or_else(|| malformed("expected '.' before quantity name"))?;
        let name: QuantityName = rest.parse()?;
        Ok(InputReference::required(reference_type, id, name))
    }
}

/// Lookup key of a published result: producer object and quantity name (no index).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    pub reference_type: ReferenceType,
    pub id: ObjectId,
    pub name: String,
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={}).{}", self.reference_type, self.id, self.name)
    }
}

/// How the elements of a vector-valued quantity are keyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKeyType {
    /// Elements are addressed by the id of the object they belong to (e.g. zone ids).
    ObjectId,
    /// Elements are addressed by position 0..n.
    Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VectorIndex {
    pub key_type: IndexKeyType,
    pub keys: Vec<u32>,
}

/// Metadata of a published result. Values are always in base SI units; `unit` is for display.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantityDescription {
    pub name: String,
    pub unit: String,
    pub description: String,
    /// Parameters never change during a run and never produce dependency edges.
    pub constant: bool,
    pub vector: Option<VectorIndex>,
    pub min_max: Option<(f64, f64)>,
}

impl QuantityDescription {
    pub fn scalar(
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
        constant: bool,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            description: description.into(),
            constant,
            vector: None,
            min_max: None,
        }
    }

    pub fn vector(
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
        constant: bool,
        key_type: IndexKeyType,
        keys: Vec<u32>,
    ) -> Self {
        Self {
            vector: Some(VectorIndex { key_type, keys }),
            ..Self::scalar(name, unit, description, constant)
        }
    }

    pub fn with_constraint(mut self, min: f64, max: f64) -> Self {
        self.min_max = Some((min, max));
        self
    }

    /// Number of scalar slots this quantity occupies.
    pub fn len(&self) -> u32 {
        match &self.vector {
            Some(v) => v.keys.len() as u32,
            None => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot offset of the element addressed by `key`.
    ///
    /// Scalars accept no index; vectors are looked up by their key set.
    pub fn position_of(&self, key: u32) -> Option<u32> {
        let v = self.vector.as_ref()?;
        v.keys.iter().position(|k| *k == key).map(|p| p as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_name_display_and_parse() {
        let q = QuantityName::indexed("HeatFlux", 12);
        assert_eq!(q.to_string(), "HeatFlux[12]");
        assert_eq!("HeatFlux[12]".parse::<QuantityName>().unwrap(), q);
        assert_eq!(
            "AirTemperature".parse::<QuantityName>().unwrap(),
            QuantityName::new("AirTemperature")
        );
        assert!("HeatFlux[x]".parse::<QuantityName>().is_err());
        assert!("[1]".parse::<QuantityName>().is_err());
    }

    #[test]
    fn input_reference_equality_ignores_required() {
        let a = InputReference::required(ReferenceType::Zone, 1, QuantityName::new("AirTemperature"));
        let b = InputReference::optional(ReferenceType::Zone, 1, QuantityName::new("AirTemperature"));
        assert_eq!(a, b);
        let c = InputReference::required(ReferenceType::Zone, 2, QuantityName::new("AirTemperature"));
        assert_ne!(a, c);
    }

    #[test]
    fn input_reference_parse() {
        let r: InputReference = "Zone(id=12).AirTemperature".parse().unwrap();
        assert_eq!(r.reference_type, ReferenceType::Zone);
        assert_eq!(r.id, 12);
        assert_eq!(r.name, QuantityName::new("AirTemperature"));
        assert_eq!(r.to_string(), "Zone(id=12).AirTemperature");

        let v: InputReference = "Model(id=10).HeatFlux[1]".parse().unwrap();
        assert_eq!(v.name.index, Some(1));

        assert!("Room(id=1).X".parse::<InputReference>().is_err());
        assert!("Zone(id=a).X".parse::<InputReference>().is_err());
        assert!("Zone(id=1)X".parse::<InputReference>().is_err());
    }

    #[test]
    fn vector_description_positions() {
        let d = QuantityDescription::vector(
            "HeatFlux",
            "W",
            "Ventilation heat flux",
            false,
            IndexKeyType::ObjectId,
            vec![3, 7, 9],
        );
        assert_eq!(d.len(), 3);
        assert_eq!(d.position_of(7), Some(1));
        assert_eq!(d.position_of(4), None);
        let s = QuantityDescription::scalar("Temperature", "K", "", false);
        assert_eq!(s.len(), 1);
        assert_eq!(s.position_of(0), None);
    }

    #[test]
    fn reference_type_keywords_round_trip() {
        for rt in ReferenceType::ALL {
            assert_eq!(rt.keyword().parse::<ReferenceType>().unwrap(), rt);
        }
    }

    mod prop {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_form_parses_back(
                rt_idx in 0usize..8,
                id in 0u32..100_000,
                name in "[A-Z][A-Za-z]{0,20}",
                index in proptest::option::of(0u32..1000),
            ) {
                let r = InputReference::required(
                    ReferenceType::ALL[rt_idx],
                    id,
                    QuantityName { name, index },
                );
                let parsed: InputReference = r.to_string().parse().unwrap();
                prop_assert_eq!(parsed, r);
            }
        }
    }
}
