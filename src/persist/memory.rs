use std::collections::BTreeMap;
use std::io;

use parking_lot::Mutex;

use super::{LedgerSnapshot, LedgerStore};
use crate::error::StoreError;
use crate::id::FactionId;
use crate::model::{Faction, Land, LandKey, Relation, canonical_pair};

#[derive(Debug, Default)]
struct Tables {
    lands: BTreeMap<LandKey, Land>,
    factions: BTreeMap<FactionId, Faction>,
    relations: BTreeMap<(FactionId, FactionId), Relation>,
}

/// A store that keeps rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with an I/O error until turned off again.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn land(&self, key: &LandKey) -> Option<Land> {
        self.tables.lock().lands.get(key).cloned()
    }

    pub fn faction(&self, id: FactionId) -> Option<Faction> {
        self.tables.lock().factions.get(&id).cloned()
    }

    pub fn relation(&self, a: FactionId, b: FactionId) -> Option<Relation> {
        self.tables.lock().relations.get(&canonical_pair(a, b)).copied()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let tables = self.tables.lock();
        LedgerSnapshot {
            factions: tables.factions.values().cloned().collect(),
            lands: tables.lands.values().cloned().collect(),
            relations: tables.relations.values().copied().collect(),
        }
    }

    fn write<F: FnOnce(&mut Tables)>(&self, f: F) -> Result<(), StoreError> {
        if *self.failing.lock() {
            return Err(io::Error::other("memory store is failing").into());
        }
        f(&mut *self.tables.lock());
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    async fn save_land(&self, land: &Land) -> Result<(), StoreError> {
        self.write(|t| {
            t.lands.insert(land.key().clone(), land.clone());
        })
    }

    async fn delete_land(&self, key: &LandKey) -> Result<(), StoreError> {
        self.write(|t| {
            t.lands.remove(key);
        })
    }

    async fn save_faction(&self, faction: &Faction) -> Result<(), StoreError> {
        self.write(|t| {
            t.factions.insert(faction.id(), faction.clone());
        })
    }

    async fn delete_faction(&self, id: FactionId) -> Result<(), StoreError> {
        self.write(|t| {
            t.factions.remove(&id);
        })
    }

    async fn save_relation(&self, relation: &Relation) -> Result<(), StoreError> {
        self.write(|t| {
            t.relations.insert(relation.pair(), *relation);
        })
    }

    async fn delete_relation(&self, one: FactionId, two: FactionId) -> Result<(), StoreError> {
        self.write(|t| {
            t.relations.remove(&canonical_pair(one, two));
        })
    }
}
