use std::fmt;
use std::str::FromStr;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::FactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    Neutral,
    Ally,
    Enemy,
    /// A faction's relation to itself. Synthesized by lookup, never stored.
    Same,
}

impl RelationKind {
    fn as_str(self) -> &'static str {
        match self {
            RelationKind::Neutral => "neutral",
            RelationKind::Ally => "ally",
            RelationKind::Enemy => "enemy",
            RelationKind::Same => "same",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parses the stored kinds only; `same` is rejected.
impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neutral" => Ok(RelationKind::Neutral),
            "ally" => Ok(RelationKind::Ally),
            "enemy" => Ok(RelationKind::Enemy),
            "same" => Err("relation kind `same` is never stored".to_string()),
            _ => Err(format!("unknown relation kind `{s}`")),
        }
    }
}

impl<'de> Deserialize<'de> for RelationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A stored edge between two distinct factions.
///
/// The pair is kept canonical (smaller id first) so `(a, b)` and `(b, a)`
/// name the same record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "RelationRepr")]
pub struct Relation {
    one: FactionId,
    two: FactionId,
    pub kind: RelationKind,
}

#[derive(Deserialize)]
struct RelationRepr {
    one: FactionId,
    two: FactionId,
    kind: RelationKind,
}

impl From<RelationRepr> for Relation {
    fn from(repr: RelationRepr) -> Self {
        Relation::new(repr.kind, repr.one, repr.two)
    }
}

impl Relation {
    pub fn new(kind: RelationKind, a: FactionId, b: FactionId) -> Self {
        let (one, two) = canonical_pair(a, b);
        Self { one, two, kind }
    }

    pub fn one(&self) -> FactionId {
        self.one
    }

    pub fn two(&self) -> FactionId {
        self.two
    }

    pub fn pair(&self) -> (FactionId, FactionId) {
        (self.one, self.two)
    }

    pub fn is_involved(&self, id: FactionId) -> bool {
        self.one == id || self.two == id
    }

    /// The participant that is not `id`, or `None` when `id` is not involved.
    pub fn other(&self, id: FactionId) -> Option<FactionId> {
        if self.one == id {
            Some(self.two)
        } else if self.two == id {
            Some(self.one)
        } else {
            None
        }
    }
}

/// Equality ignores the kind and the stored order of the pair.
impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.pair() == other.pair()
    }
}

impl Eq for Relation {}

/// Return the canonical pair ordering (smaller id first).
pub fn canonical_pair(a: FactionId, b: FactionId) -> (FactionId, FactionId) {
    if a <= b { (a, b) } else { (b, a) }
}
