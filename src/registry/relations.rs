use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::error::LedgerError;
use crate::id::FactionId;
use crate::model::{Relation, RelationKind, canonical_pair};

/// Symmetric relations between factions.
///
/// Keyed by canonical pairs (smaller id first). Only ALLY and ENEMY edges are
/// stored: setting NEUTRAL removes the edge, and absence reads as NEUTRAL.
/// SAME is synthesized for `a == b`.
#[derive(Debug, Default)]
pub struct RelationGraph {
    edges: RwLock<BTreeMap<(FactionId, FactionId), RelationKind>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stored edges. Self-edges and NEUTRAL edges are skipped.
    pub fn from_relations(relations: impl IntoIterator<Item = Relation>) -> Self {
        let graph = Self::new();
        {
            let mut edges = graph.edges.write();
            for rel in relations {
                let (one, two) = rel.pair();
                if one == two || matches!(rel.kind, RelationKind::Neutral | RelationKind::Same) {
                    tracing::warn!(%one, %two, kind = %rel.kind, "skipping unstorable relation");
                    continue;
                }
                edges.insert((one, two), rel.kind);
            }
        }
        graph
    }

    /// Insert or overwrite the edge for the unordered pair. Last write wins.
    ///
    /// Returns the stored edge, or `None` when the pair went back to NEUTRAL
    /// and the edge was removed.
    pub fn set_relation(
        &self,
        a: FactionId,
        b: FactionId,
        kind: RelationKind,
    ) -> Result<Option<Relation>, LedgerError> {
        self.set_relation_and(a, b, kind, |_| {})
    }

    /// Like [`set_relation`](Self::set_relation), but runs `after` on the
    /// outcome while the graph is still write-locked, so side effects of
    /// concurrent writes to the same pair happen in the order the writes
    /// landed.
    pub fn set_relation_and(
        &self,
        a: FactionId,
        b: FactionId,
        kind: RelationKind,
        after: impl FnOnce(Option<&Relation>),
    ) -> Result<Option<Relation>, LedgerError> {
        if a == b {
            return Err(LedgerError::SelfRelation);
        }
        let pair = canonical_pair(a, b);
        let mut edges = self.edges.write();
        let stored = match kind {
            RelationKind::Same => return Err(LedgerError::InvalidRelation(kind)),
            RelationKind::Neutral => {
                edges.remove(&pair);
                tracing::debug!(one = %pair.0, two = %pair.1, "relation reset to neutral");
                None
            }
            RelationKind::Ally | RelationKind::Enemy => {
                edges.insert(pair, kind);
                tracing::debug!(one = %pair.0, two = %pair.1, %kind, "relation set");
                Some(Relation::new(kind, pair.0, pair.1))
            }
        };
        after(stored.as_ref());
        Ok(stored)
    }

    pub fn get_relation(&self, a: FactionId, b: FactionId) -> RelationKind {
        if a == b {
            return RelationKind::Same;
        }
        self.edges
            .read()
            .get(&canonical_pair(a, b))
            .copied()
            .unwrap_or(RelationKind::Neutral)
    }

    /// Every faction in `known` whose relation to `a` is `kind`.
    ///
    /// `a` itself is only included when SAME is asked for.
    pub fn get_relations(
        &self,
        a: FactionId,
        kind: RelationKind,
        known: impl IntoIterator<Item = FactionId>,
    ) -> BTreeSet<FactionId> {
        let edges = self.edges.read();
        known
            .into_iter()
            .filter(|&b| {
                let rel = if a == b {
                    RelationKind::Same
                } else {
                    edges
                        .get(&canonical_pair(a, b))
                        .copied()
                        .unwrap_or(RelationKind::Neutral)
                };
                rel == kind
            })
            .collect()
    }

    /// Factions with a stored edge of `kind` to `a`. Only meaningful for
    /// ALLY and ENEMY.
    pub fn partners(&self, a: FactionId, kind: RelationKind) -> BTreeSet<FactionId> {
        self.edges
            .read()
            .iter()
            .filter(|&(_, &k)| k == kind)
            .filter_map(|(&(one, two), _)| {
                if one == a {
                    Some(two)
                } else if two == a {
                    Some(one)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Drop every edge touching `id`. Returns the removed pairs.
    pub fn remove_all_involving(&self, id: FactionId) -> Vec<(FactionId, FactionId)> {
        let mut edges = self.edges.write();
        let doomed: Vec<_> = edges
            .keys()
            .filter(|(one, two)| *one == id || *two == id)
            .copied()
            .collect();
        for pair in &doomed {
            edges.remove(pair);
        }
        doomed
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.edges
            .read()
            .iter()
            .map(|(&(one, two), &kind)| Relation::new(kind, one, two))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }
}
