use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;

use crate::config::{LedgerConfig, SavePolicy};
use crate::error::LedgerError;
use crate::id::FactionId;
use crate::model::{Faction, LandKey, LandWrite, Location, Rank, RelationKind};
use crate::persist::{LedgerSnapshot, PersistQueue, PersistRequest};
use crate::registry::{
    FactionHandle, FactionManager, LandManager, LeaveOutcome, PlayerModes, RelationGraph,
};

/// Territory, factions, and relations for one server.
///
/// Every method is safe to call from any thread. Mutations update memory
/// first and then hand persistence requests to the queue without waiting.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    factions: FactionManager,
    lands: LandManager,
    relations: RelationGraph,
    modes: PlayerModes,
    queue: PersistQueue,
}

impl Ledger {
    pub fn new(config: LedgerConfig, queue: PersistQueue) -> Self {
        let policy = config.save_policy();
        Self {
            factions: FactionManager::new(queue.clone(), policy, config.max_name_len),
            lands: LandManager::new(queue.clone(), policy),
            relations: RelationGraph::new(),
            modes: PlayerModes::new(),
            config,
            queue,
        }
    }

    /// Rebuild a ledger from stored state. Land and relations that point at
    /// unknown factions are dropped.
    pub fn from_snapshot(config: LedgerConfig, queue: PersistQueue, snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(config, queue);
        let LedgerSnapshot {
            factions,
            lands,
            relations,
        } = snapshot;
        let faction_count = factions.len();
        for faction in factions {
            ledger.factions.load(faction);
        }
        let known: BTreeSet<_> = ledger.factions.ids().into_iter().collect();
        let land_count = lands.len();
        for land in lands {
            if known.contains(&land.claimer_id()) {
                ledger.lands.load(land);
            } else {
                tracing::warn!(land = %land.key(), faction = %land.claimer_id(), "dropping land of unknown faction");
            }
        }
        let relations: Vec<_> = relations
            .into_iter()
            .filter(|r| known.contains(&r.one()) && known.contains(&r.two()))
            .collect();
        ledger.relations = RelationGraph::from_relations(relations);
        tracing::info!(
            factions = faction_count,
            lands = land_count,
            relations = ledger.relations.len(),
            "ledger loaded"
        );
        ledger
    }

    /// Copy of everything a flush would write.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            factions: self
                .factions
                .all()
                .into_iter()
                .filter(|f| !f.is_zone())
                .collect(),
            lands: self.lands.claimed(),
            relations: self.relations.relations(),
        }
    }

    /// Queue a save for every faction, claimed cell and relation edge.
    /// Returns how many requests were queued.
    pub fn flush(&self) -> usize {
        let snapshot = self.snapshot();
        let total = snapshot.factions.len() + snapshot.lands.len() + snapshot.relations.len();
        for faction in snapshot.factions {
            self.queue.send(PersistRequest::SaveFaction(faction));
        }
        for land in snapshot.lands {
            self.queue.send(PersistRequest::SaveLand(land));
        }
        for relation in snapshot.relations {
            self.queue.send(PersistRequest::SaveRelation(relation));
        }
        tracing::info!(requests = total, "ledger flushed");
        total
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn factions(&self) -> &FactionManager {
        &self.factions
    }

    pub fn lands(&self) -> &LandManager {
        &self.lands
    }

    pub fn relations(&self) -> &RelationGraph {
        &self.relations
    }

    pub fn modes(&self) -> &PlayerModes {
        &self.modes
    }

    fn actor_faction(&self, actor: &str) -> Result<FactionHandle, LedgerError> {
        self.factions
            .of_player(actor)
            .ok_or_else(|| LedgerError::NoFaction {
                player: actor.to_string(),
            })
    }

    /// Drop everything that still refers to a faction that left the registry.
    fn finish_removal(&self, faction: &Faction) {
        let id = faction.id();
        let released = self.lands.unclaim_all(id);
        for (one, two) in self.relations.remove_all_involving(id) {
            self.queue.send(PersistRequest::DeleteRelation(one, two));
        }
        tracing::info!(faction = %id, released, "faction destroyed");
    }

    // --- factions ---

    pub fn create_faction(&self, player: &str, name: &str) -> Result<FactionId, LedgerError> {
        Ok(self.factions.create(player, name)?.read().id())
    }

    /// Disband the actor's faction, releasing its land and relations.
    pub fn disband(&self, actor: &str) -> Result<Faction, LedgerError> {
        let faction = self.factions.disband(actor)?;
        self.finish_removal(&faction);
        Ok(faction)
    }

    pub fn join(&self, player: &str, faction_name: &str) -> Result<FactionId, LedgerError> {
        self.factions.join(player, faction_name)
    }

    /// Leave the current faction. When the last player leaves, the faction is
    /// destroyed like a disband.
    pub fn leave(&self, player: &str) -> Result<LeaveOutcome, LedgerError> {
        let outcome = self.factions.leave(player)?;
        if let LeaveOutcome::Emptied(faction) = &outcome {
            self.finish_removal(faction);
        }
        Ok(outcome)
    }

    pub fn invite(&self, actor: &str, player: &str) -> Result<bool, LedgerError> {
        if let Some(faction) = self.factions.faction_id_of(player) {
            return Err(LedgerError::AlreadyInFaction {
                player: player.to_string(),
                faction,
            });
        }
        self.factions.update(actor, Rank::Mod, |f| f.invite(player))
    }

    pub fn deinvite(&self, actor: &str, player: &str) -> Result<bool, LedgerError> {
        self.factions.update(actor, Rank::Mod, |f| f.deinvite(player))
    }

    pub fn kick(&self, actor: &str, target: &str) -> Result<FactionId, LedgerError> {
        self.factions.kick(actor, target)
    }

    pub fn toggle_mod(&self, actor: &str, target: &str) -> Result<Rank, LedgerError> {
        self.factions.toggle_mod(actor, target)
    }

    pub fn transfer_admin(&self, actor: &str, target: &str) -> Result<(), LedgerError> {
        self.factions.transfer_admin(actor, target)
    }

    pub fn rename(&self, actor: &str, name: &str) -> Result<(), LedgerError> {
        self.factions.rename(actor, name)
    }

    pub fn set_description(&self, actor: &str, description: &str) -> Result<(), LedgerError> {
        self.factions
            .update(actor, Rank::Mod, |f| f.set_description(description))
    }

    pub fn set_open(&self, actor: &str, open: bool) -> Result<(), LedgerError> {
        self.factions.update(actor, Rank::Mod, |f| f.set_open(open))
    }

    pub fn set_home(&self, actor: &str, home: Option<Location>) -> Result<(), LedgerError> {
        self.factions.update(actor, Rank::Mod, |f| f.set_home(home))
    }

    /// Flip the peaceful flag. Returns the new value.
    pub fn toggle_peaceful(&self, actor: &str) -> Result<bool, LedgerError> {
        self.factions.update(actor, Rank::Admin, |f| {
            let peaceful = !f.is_peaceful();
            f.set_peaceful(peaceful);
            peaceful
        })
    }

    // --- relations ---

    pub fn relation_between(&self, a: FactionId, b: FactionId) -> RelationKind {
        self.relations.get_relation(a, b)
    }

    /// Relation between the factions of two players. Players without a
    /// faction are neutral to everyone, themselves included.
    pub fn relation_of_players(&self, a: &str, b: &str) -> RelationKind {
        match (self.factions.faction_id_of(a), self.factions.faction_id_of(b)) {
            (Some(fa), Some(fb)) => self.relations.get_relation(fa, fb),
            _ => RelationKind::Neutral,
        }
    }

    /// Every registered faction whose relation to `id` is `kind`.
    pub fn relations_of(&self, id: FactionId, kind: RelationKind) -> BTreeSet<FactionId> {
        let known = self.factions.ids().into_iter().filter(|f| !f.is_zone());
        self.relations.get_relations(id, kind, known)
    }

    /// Set the relation between the actor's faction and the named one.
    pub fn declare(
        &self,
        actor: &str,
        target_name: &str,
        kind: RelationKind,
    ) -> Result<RelationKind, LedgerError> {
        let own = self.actor_faction(actor)?;
        let target = self
            .factions
            .by_name(target_name)
            .ok_or_else(|| LedgerError::NoSuchFaction(target_name.to_string()))?;
        if Arc::ptr_eq(&own, &target) {
            return Err(LedgerError::SelfRelation);
        }

        // Both read locks are taken in id order.
        let (own_id, target_id) = (own.read().id(), target.read().id());
        let (first, second) = if own_id < target_id {
            (&own, &target)
        } else {
            (&target, &own)
        };
        let first = first.read();
        let second = second.read();
        let (own_f, target_f) = if own_id < target_id {
            (&*first, &*second)
        } else {
            (&*second, &*first)
        };

        if own_f.is_disbanded() {
            return Err(LedgerError::NoFaction {
                player: actor.to_string(),
            });
        }
        if target_f.is_disbanded() {
            return Err(LedgerError::NoSuchFaction(target_name.to_string()));
        }
        own_f.require(actor, Rank::Mod)?;
        if target_f.is_zone() {
            return Err(LedgerError::ZoneFaction(target_id));
        }
        if kind == RelationKind::Enemy && target_f.is_peaceful() {
            return Err(LedgerError::PeacefulTarget(target_id));
        }

        // Queued under the graph lock so the requests for a pair reach the
        // store in the order the edge changed.
        let eager = self.config.save_policy().saves_eagerly();
        self.relations
            .set_relation_and(own_id, target_id, kind, |stored| match stored {
                Some(&stored) => {
                    if eager {
                        self.queue.send(PersistRequest::SaveRelation(stored));
                    }
                }
                None => {
                    let (one, two) = crate::model::canonical_pair(own_id, target_id);
                    self.queue.send(PersistRequest::DeleteRelation(one, two));
                }
            })?;
        tracing::debug!(from = %own_id, to = %target_id, %kind, %actor, "relation declared");
        Ok(kind)
    }

    // --- territory ---

    /// Claim `key` for the actor's faction. The cell must be wilderness or
    /// already the faction's own.
    pub fn claim_here(&self, actor: &str, key: &LandKey) -> Result<FactionId, LedgerError> {
        let handle = self.actor_faction(actor)?;
        let faction = handle.read();
        if faction.is_disbanded() {
            return Err(LedgerError::NoFaction {
                player: actor.to_string(),
            });
        }
        faction.require(actor, Rank::Mod)?;
        let id = faction.id();
        self.lands.claim_if(key, id, |land| {
            let current = land.claimer_id();
            if current.is_wilderness() || current == id {
                Ok(())
            } else if current.is_zone() {
                Err(LedgerError::NotClaimable)
            } else {
                Err(LedgerError::AlreadyClaimed(current))
            }
        })?;
        Ok(id)
    }

    /// Release `key` from the actor's faction.
    pub fn unclaim_here(&self, actor: &str, key: &LandKey) -> Result<(), LedgerError> {
        let handle = self.actor_faction(actor)?;
        let faction = handle.read();
        faction.require(actor, Rank::Mod)?;
        let id = faction.id();
        self.lands.claim_if(key, FactionId::WILDERNESS, |land| {
            if land.claimer_id() == id {
                Ok(())
            } else {
                Err(LedgerError::NotClaimedBy(id))
            }
        })
    }

    /// Release every cell of the actor's faction. Returns how many.
    pub fn unclaim_all(&self, actor: &str) -> Result<usize, LedgerError> {
        let handle = self.actor_faction(actor)?;
        let faction = handle.read();
        faction.require(actor, Rank::Mod)?;
        Ok(self.lands.unclaim_all(faction.id()))
    }

    /// Server-side claim of `key` for a zone, or back to wilderness.
    /// Overrides whatever held the cell before.
    pub fn claim_for_zone(&self, zone: FactionId, key: &LandKey) -> Result<(), LedgerError> {
        if !zone.is_zone() && !zone.is_wilderness() {
            return Err(LedgerError::NotClaimable);
        }
        self.set_claim(key, zone)
    }

    /// Hand `key` to `faction` regardless of who held it, skipping rank
    /// checks. The wilderness sentinel unclaims. Ids the registry does not
    /// know leave the cell untouched.
    pub fn set_claim(&self, key: &LandKey, faction: FactionId) -> Result<(), LedgerError> {
        if faction.is_wilderness() {
            self.lands.claim(key, faction);
            return Ok(());
        }
        let handle = self.factions.get(faction);
        let owner = handle.as_ref().map(|h| h.read());
        if owner.as_ref().is_none_or(|f| f.is_disbanded()) {
            tracing::warn!(land = %key, %faction, "refusing claim for unknown faction");
            return Err(LedgerError::NoSuchFaction(faction.to_string()));
        }
        self.lands.claim(key, faction);
        Ok(())
    }

    /// Toggle build permission for `player` on a cell of the actor's faction.
    pub fn toggle_owner(&self, actor: &str, key: &LandKey, player: &str) -> Result<bool, LedgerError> {
        let handle = self.actor_faction(actor)?;
        let faction = handle.read();
        faction.require(actor, Rank::Mod)?;
        let id = faction.id();
        self.lands.modify(key, |land| {
            if land.claimer_id() != id {
                return Err(LedgerError::NotClaimedBy(id));
            }
            let can_build = land.toggle_owner(player);
            tracing::debug!(land = %key, %player, can_build, "owner toggled");
            Ok((can_build, LandWrite::Save))
        })
    }

    pub fn owner_list(&self, key: &LandKey) -> Vec<String> {
        self.lands.owners(key)
    }

    pub fn lands_of(&self, id: FactionId) -> Vec<LandKey> {
        self.lands.lands_of(id)
    }

    /// Handle of the faction claiming `key`, if any.
    pub fn claimer_at(&self, key: &LandKey) -> Option<FactionHandle> {
        self.factions.get(self.lands.claimer_of(key))
    }
}

/// Run [`Ledger::flush`] on the configured interval until the ledger is
/// dropped. Returns `None` unless the config asks for periodic saving.
pub fn spawn_periodic_flush(ledger: &Arc<Ledger>) -> Option<JoinHandle<()>> {
    let SavePolicy::Batched {
        interval: Some(period),
    } = ledger.config.save_policy()
    else {
        return None;
    };
    let weak: Weak<Ledger> = Arc::downgrade(ledger);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(ledger) = weak.upgrade() else {
                break;
            };
            ledger.flush();
        }
        tracing::debug!("periodic flush stopped");
    }))
}
