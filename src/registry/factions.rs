use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::SavePolicy;
use crate::error::LedgerError;
use crate::id::{FactionId, FactionIdGenerator};
use crate::model::{Faction, FactionKind, Rank};
use crate::persist::{PersistQueue, PersistRequest};

pub type FactionHandle = Arc<RwLock<Faction>>;

#[derive(Debug, Default)]
struct Index {
    by_id: BTreeMap<FactionId, FactionHandle>,
    /// Lowercased name to id.
    by_name: HashMap<String, FactionId>,
    /// Player name to the one faction they belong to.
    by_player: HashMap<String, FactionId>,
}

impl Index {
    fn insert(&mut self, faction: Faction) -> FactionHandle {
        let id = faction.id();
        let name = faction.name().to_lowercase();
        if let Some(prev) = self.by_name.insert(name, id) {
            if prev != id {
                tracing::warn!(name = %faction.name(), faction = %id, previous = %prev, "duplicate faction name");
            }
        }
        for (player, _) in faction.all_members() {
            if let Some(prev) = self.by_player.insert(player.to_string(), id) {
                tracing::warn!(%player, faction = %id, previous = %prev, "player listed in two factions");
            }
        }
        let handle = Arc::new(RwLock::new(faction));
        self.by_id.insert(id, handle.clone());
        handle
    }

    fn player_faction(&self, player: &str) -> Option<FactionId> {
        self.by_player.get(player).copied()
    }

    fn handle_of_player(&self, player: &str) -> Result<(FactionId, FactionHandle), LedgerError> {
        self.player_faction(player)
            .and_then(|id| self.by_id.get(&id).map(|h| (id, h.clone())))
            .ok_or_else(|| LedgerError::NoFaction {
                player: player.to_string(),
            })
    }
}

/// What happened when a player left their faction.
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left(FactionId),
    /// The player was the last one in; the faction is gone from the registry
    /// and the caller must finish the cascade.
    Emptied(Faction),
}

/// Registry of every faction, plus the player-to-faction index that keeps
/// each player in at most one roster.
///
/// Lock order: the index lock, then a faction's lock. Nothing here takes the
/// index lock while a faction lock is held.
#[derive(Debug)]
pub struct FactionManager {
    index: RwLock<Index>,
    ids: FactionIdGenerator,
    queue: PersistQueue,
    policy: SavePolicy,
    max_name_len: usize,
}

impl FactionManager {
    /// A registry holding the two built-in zones.
    pub fn new(queue: PersistQueue, policy: SavePolicy, max_name_len: usize) -> Self {
        let manager = Self {
            index: RwLock::new(Index::default()),
            ids: FactionIdGenerator::new(),
            queue,
            policy,
            max_name_len,
        };
        {
            let mut index = manager.index.write();
            index.insert(Faction::zone(FactionId::SAFE_ZONE, FactionKind::SafeZone, "SafeZone"));
            index.insert(Faction::zone(FactionId::WAR_ZONE, FactionKind::WarZone, "WarZone"));
        }
        manager
    }

    /// Register a faction loaded from storage. Replaces a zone with the same id.
    pub fn load(&self, faction: Faction) {
        let id = faction.id();
        if !id.is_valid() {
            tracing::warn!(faction = %id, "ignoring stored faction with invalid id");
            return;
        }
        self.ids.observe(id);
        let mut index = self.index.write();
        if let Some(old) = index.by_id.remove(&id) {
            let name = old.read().name().to_lowercase();
            if index.by_name.get(&name) == Some(&id) {
                index.by_name.remove(&name);
            }
            index.by_player.retain(|_, f| *f != id);
        }
        index.insert(faction);
    }

    fn persist(&self, faction: &Faction) {
        if self.policy.saves_eagerly() {
            self.queue.send(PersistRequest::SaveFaction(faction.clone()));
        }
    }

    fn check_name(&self, index: &Index, name: &str, own: Option<FactionId>) -> Result<(), LedgerError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed != name {
            return Err(LedgerError::InvalidName {
                name: name.to_string(),
                reason: "must be non-empty with no surrounding spaces",
            });
        }
        if name.chars().count() > self.max_name_len {
            return Err(LedgerError::InvalidName {
                name: name.to_string(),
                reason: "too long",
            });
        }
        match index.by_name.get(&name.to_lowercase()) {
            Some(&taken) if Some(taken) != own => Err(LedgerError::NameTaken(name.to_string())),
            _ => Ok(()),
        }
    }

    pub fn get(&self, id: FactionId) -> Option<FactionHandle> {
        if id.is_wilderness() {
            return None;
        }
        self.index.read().by_id.get(&id).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<FactionHandle> {
        let index = self.index.read();
        index
            .by_name
            .get(&name.to_lowercase())
            .and_then(|id| index.by_id.get(id))
            .cloned()
    }

    pub fn faction_id_of(&self, player: &str) -> Option<FactionId> {
        self.index.read().player_faction(player)
    }

    pub fn of_player(&self, player: &str) -> Option<FactionHandle> {
        self.index.read().handle_of_player(player).ok().map(|(_, h)| h)
    }

    /// Ids of every registered faction, zones included.
    pub fn ids(&self) -> Vec<FactionId> {
        self.index.read().by_id.keys().copied().collect()
    }

    /// Copies of every registered faction, for flushing.
    pub fn all(&self) -> Vec<Faction> {
        let handles: Vec<_> = self.index.read().by_id.values().cloned().collect();
        handles.iter().map(|h| h.read().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().by_id.is_empty()
    }

    /// Create a faction with `admin` as its admin.
    pub fn create(&self, admin: &str, name: &str) -> Result<FactionHandle, LedgerError> {
        let mut index = self.index.write();
        if let Some(faction) = index.player_faction(admin) {
            return Err(LedgerError::AlreadyInFaction {
                player: admin.to_string(),
                faction,
            });
        }
        self.check_name(&index, name, None)?;
        let id = self.ids.next_id().ok_or(LedgerError::IdsExhausted)?;
        let faction = Faction::new(id, name, admin);
        self.persist(&faction);
        tracing::info!(faction = %id, %name, %admin, "faction created");
        Ok(index.insert(faction))
    }

    /// Unregister `faction` and queue its delete. Both the index and the
    /// faction must be write-locked by the caller.
    fn detach(&self, index: &mut Index, faction: &mut Faction) -> Faction {
        let id = faction.id();
        faction.mark_disbanded();
        index.by_id.remove(&id);
        let name = faction.name().to_lowercase();
        if index.by_name.get(&name) == Some(&id) {
            index.by_name.remove(&name);
        }
        index.by_player.retain(|_, f| *f != id);
        self.queue.send(PersistRequest::DeleteFaction(id));
        tracing::info!(faction = %id, name = %faction.name(), "faction removed");
        faction.clone()
    }

    /// Take a faction out of the registry and release its players.
    /// Zones cannot be removed.
    pub fn remove(&self, id: FactionId) -> Result<Faction, LedgerError> {
        let mut index = self.index.write();
        let handle = index
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NoSuchFaction(id.to_string()))?;
        let mut faction = handle.write();
        if faction.is_zone() {
            return Err(LedgerError::ZoneFaction(id));
        }
        Ok(self.detach(&mut index, &mut faction))
    }

    /// Remove a faction on behalf of its admin. The rank check and the
    /// removal happen under the same locks.
    pub fn disband(&self, actor: &str) -> Result<Faction, LedgerError> {
        let mut index = self.index.write();
        let (_, handle) = index.handle_of_player(actor)?;
        let mut faction = handle.write();
        faction.require(actor, Rank::Admin)?;
        Ok(self.detach(&mut index, &mut faction))
    }

    /// Put `player` on the member roster of the named faction. Allowed when
    /// the faction is open or has invited them; the invitation is used up.
    pub fn join(&self, player: &str, faction_name: &str) -> Result<FactionId, LedgerError> {
        let mut index = self.index.write();
        if let Some(faction) = index.player_faction(player) {
            return Err(LedgerError::AlreadyInFaction {
                player: player.to_string(),
                faction,
            });
        }
        let id = index
            .by_name
            .get(&faction_name.to_lowercase())
            .copied()
            .ok_or_else(|| LedgerError::NoSuchFaction(faction_name.to_string()))?;
        let handle = index
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NoSuchFaction(faction_name.to_string()))?;
        let mut faction = handle.write();
        if !faction.capabilities().joinable {
            return Err(LedgerError::ZoneFaction(id));
        }
        if !faction.is_open() && !faction.is_invited(player) {
            return Err(LedgerError::NotInvited {
                player: player.to_string(),
                faction: id,
            });
        }
        faction.deinvite(player);
        faction.add(player);
        index.by_player.insert(player.to_string(), id);
        self.persist(&faction);
        tracing::debug!(faction = %id, %player, "player joined");
        Ok(id)
    }

    /// Take `player` off their faction's roster.
    ///
    /// Mods and members leave freely. The admin may only leave when nobody
    /// else is left, which empties the faction.
    pub fn leave(&self, player: &str) -> Result<LeaveOutcome, LedgerError> {
        let mut index = self.index.write();
        let (id, handle) = index.handle_of_player(player)?;
        let mut faction = handle.write();
        if faction.rank(player)? == Rank::Admin {
            if faction.member_count() > 1 {
                return Err(LedgerError::AdminCannotLeave);
            }
            tracing::info!(faction = %id, %player, "last member left");
            return Ok(LeaveOutcome::Emptied(self.detach(&mut index, &mut faction)));
        }
        faction.remove_from_roster(player);
        index.by_player.remove(player);
        self.persist(&faction);
        tracing::debug!(faction = %id, %player, "player left");
        Ok(LeaveOutcome::Left(id))
    }

    /// Remove `target` from `actor`'s faction. The actor must be a mod or
    /// above and outrank the target.
    pub fn kick(&self, actor: &str, target: &str) -> Result<FactionId, LedgerError> {
        let mut index = self.index.write();
        let (id, handle) = index.handle_of_player(actor)?;
        let mut faction = handle.write();
        let actor_rank = faction.require(actor, Rank::Mod)?;
        let target_rank = faction.rank(target)?;
        if target_rank >= actor_rank {
            return Err(LedgerError::InsufficientRank {
                required: target_rank,
                actual: actor_rank,
            });
        }
        faction.remove_from_roster(target);
        faction.deinvite(target);
        index.by_player.remove(target);
        self.persist(&faction);
        tracing::debug!(faction = %id, %actor, %target, "player kicked");
        Ok(id)
    }

    /// Promote a member to mod, or demote a mod to member. Admin only.
    /// Returns the target's new rank.
    pub fn toggle_mod(&self, actor: &str, target: &str) -> Result<Rank, LedgerError> {
        let index = self.index.read();
        let (id, handle) = index.handle_of_player(actor)?;
        let mut faction = handle.write();
        drop(index);
        faction.require(actor, Rank::Admin)?;
        let rank = match faction.rank(target)? {
            Rank::Admin => {
                return Err(LedgerError::InsufficientRank {
                    required: Rank::Admin,
                    actual: Rank::Admin,
                });
            }
            Rank::Mod => {
                faction.remove_from_roster(target);
                faction.add(target);
                Rank::Member
            }
            Rank::Member => {
                faction.remove_from_roster(target);
                faction.add_mods([target]);
                Rank::Mod
            }
        };
        self.persist(&faction);
        tracing::debug!(faction = %id, %target, %rank, "rank changed");
        Ok(rank)
    }

    /// Hand the faction to another member. The old admin becomes a mod.
    pub fn transfer_admin(&self, actor: &str, target: &str) -> Result<(), LedgerError> {
        let index = self.index.read();
        let (id, handle) = index.handle_of_player(actor)?;
        let mut faction = handle.write();
        drop(index);
        faction.require(actor, Rank::Admin)?;
        if faction.rank(target)? == Rank::Admin {
            return Ok(());
        }
        faction.remove_from_roster(target);
        faction.set_admin(target);
        faction.add_mods([actor]);
        self.persist(&faction);
        tracing::debug!(faction = %id, from = %actor, to = %target, "admin transferred");
        Ok(())
    }

    pub fn rename(&self, actor: &str, name: &str) -> Result<(), LedgerError> {
        let mut index = self.index.write();
        let (id, handle) = index.handle_of_player(actor)?;
        let mut faction = handle.write();
        faction.require(actor, Rank::Mod)?;
        self.check_name(&index, name, Some(id))?;
        index.by_name.remove(&faction.name().to_lowercase());
        index.by_name.insert(name.to_lowercase(), id);
        faction.set_name(name);
        self.persist(&faction);
        tracing::debug!(faction = %id, %name, "faction renamed");
        Ok(())
    }

    /// Run `f` on the actor's faction under its write lock, after checking
    /// the actor holds `required`. The result is persisted.
    pub fn update<T>(
        &self,
        actor: &str,
        required: Rank,
        f: impl FnOnce(&mut Faction) -> T,
    ) -> Result<T, LedgerError> {
        let (id, handle) = self.index.read().handle_of_player(actor)?;
        let mut faction = handle.write();
        if faction.is_disbanded() {
            return Err(LedgerError::NoSuchFaction(id.to_string()));
        }
        faction.require(actor, required)?;
        let out = f(&mut *faction);
        self.persist(&faction);
        Ok(out)
    }
}
