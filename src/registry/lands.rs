use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::factions::{FactionHandle, FactionManager};
use crate::config::SavePolicy;
use crate::id::FactionId;
use crate::model::{Land, LandKey, LandWrite, Location};
use crate::persist::{PersistQueue, PersistRequest};

pub type LandHandle = Arc<RwLock<Land>>;

impl Land {
    /// The faction claiming this cell, or `None` for wilderness and for ids
    /// the registry no longer knows.
    pub fn claimed_by(&self, factions: &FactionManager) -> Option<FactionHandle> {
        factions.get(self.claimer_id())
    }
}

/// Registry of land cells keyed by coordinate.
///
/// Cells are created unclaimed on first lookup and kept in memory; they are
/// only written to storage once claimed.
#[derive(Debug)]
pub struct LandManager {
    cells: RwLock<HashMap<LandKey, LandHandle>>,
    queue: PersistQueue,
    policy: SavePolicy,
}

impl LandManager {
    pub fn new(queue: PersistQueue, policy: SavePolicy) -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            queue,
            policy,
        }
    }

    /// Register a cell loaded from storage. Unclaimed cells are ignored.
    pub fn load(&self, land: Land) {
        if !land.is_claimed() {
            return;
        }
        self.cells
            .write()
            .insert(land.key().clone(), Arc::new(RwLock::new(land)));
    }

    /// The cell at `key`, creating an unclaimed one if none exists yet.
    /// Concurrent first lookups of the same key get the same cell.
    pub fn land_at(&self, key: &LandKey) -> LandHandle {
        if let Some(handle) = self.cells.read().get(key) {
            return handle.clone();
        }
        self.cells
            .write()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(Land::new(key.clone()))))
            .clone()
    }

    pub fn get_land_at(&self, location: &Location) -> LandHandle {
        self.land_at(&LandKey::containing(location))
    }

    /// Claimer of `key` without creating a cell for it.
    pub fn claimer_of(&self, key: &LandKey) -> FactionId {
        let handle = self.cells.read().get(key).cloned();
        handle.map_or(FactionId::WILDERNESS, |h| h.read().claimer_id())
    }

    fn write_back(&self, land: &Land, write: LandWrite) {
        match write {
            LandWrite::Delete => self.queue.send(PersistRequest::DeleteLand(land.key().clone())),
            LandWrite::Save if self.policy.saves_eagerly() => {
                self.queue.send(PersistRequest::SaveLand(land.clone()))
            }
            LandWrite::Save => {}
        }
    }

    /// Set the claimer of `key`. The wilderness sentinel unclaims it.
    /// Callers check that `faction` is registered.
    pub(crate) fn claim(&self, key: &LandKey, faction: FactionId) {
        let handle = self.land_at(key);
        let mut land = handle.write();
        let write = land.claim(faction);
        tracing::debug!(land = %key, faction = %land.claimer_id(), "land claimed");
        self.write_back(&land, write);
    }

    /// Claim `key` only if `check` accepts the current state, all under the
    /// cell's write lock.
    pub(crate) fn claim_if<E>(
        &self,
        key: &LandKey,
        faction: FactionId,
        check: impl FnOnce(&Land) -> Result<(), E>,
    ) -> Result<(), E> {
        self.modify(key, |land| {
            check(land)?;
            let write = land.claim(faction);
            tracing::debug!(land = %land.key(), faction = %land.claimer_id(), "land claimed");
            Ok(((), write))
        })
    }

    /// Run `f` on the cell at `key` under its write lock and hand the
    /// resulting write to persistence.
    pub(crate) fn modify<T, E>(
        &self,
        key: &LandKey,
        f: impl FnOnce(&mut Land) -> Result<(T, LandWrite), E>,
    ) -> Result<T, E> {
        let handle = self.land_at(key);
        let mut land = handle.write();
        let (out, write) = f(&mut *land)?;
        self.write_back(&land, write);
        Ok(out)
    }

    /// Toggle build permission for `player` on `key`. Returns true if they
    /// can now build.
    pub fn toggle_owner(&self, key: &LandKey, player: &str) -> bool {
        let handle = self.land_at(key);
        let mut land = handle.write();
        let can_build = land.toggle_owner(player);
        tracing::debug!(land = %key, %player, can_build, "owner toggled");
        self.write_back(&land, LandWrite::Save);
        can_build
    }

    pub fn owners(&self, key: &LandKey) -> Vec<String> {
        let handle = self.cells.read().get(key).cloned();
        handle.map(|h| h.read().owners()).unwrap_or_default()
    }

    /// Keys of every cell claimed by `faction`.
    pub fn lands_of(&self, faction: FactionId) -> Vec<LandKey> {
        let mut keys: Vec<_> = self
            .cells
            .read()
            .iter()
            .filter(|(_, h)| h.read().claimer_id() == faction)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn count_of(&self, faction: FactionId) -> usize {
        self.cells
            .read()
            .values()
            .filter(|h| h.read().claimer_id() == faction)
            .count()
    }

    /// Unclaim every cell held by `faction`. Returns how many were released.
    pub fn unclaim_all(&self, faction: FactionId) -> usize {
        let handles: Vec<_> = self.cells.read().values().cloned().collect();
        let mut released = 0;
        for handle in handles {
            let mut land = handle.write();
            if land.claimer_id() == faction {
                let write = land.unclaim();
                self.write_back(&land, write);
                released += 1;
            }
        }
        tracing::debug!(%faction, released, "released all land");
        released
    }

    /// Copies of every claimed cell.
    pub fn claimed(&self) -> Vec<Land> {
        let mut lands: Vec<_> = self
            .cells
            .read()
            .values()
            .filter_map(|h| {
                let land = h.read();
                land.is_claimed().then(|| land.clone())
            })
            .collect();
        lands.sort_by(|a, b| a.key().cmp(b.key()));
        lands
    }

    /// Forget unclaimed cells nobody else holds a handle to.
    pub fn prune_unclaimed(&self) -> usize {
        let mut cells = self.cells.write();
        let before = cells.len();
        cells.retain(|_, h| Arc::strong_count(h) > 1 || h.read().is_claimed());
        before - cells.len()
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }
}
