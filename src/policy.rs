//! Allow/deny and routing decisions derived from ledger state, for the host's
//! event handlers to act on.

use std::collections::BTreeMap;

use crate::error::LedgerError;
use crate::id::FactionId;
use crate::ledger::Ledger;
use crate::model::{LandKey, Location, RelationKind};

/// Name shown for unclaimed territory.
pub const WILDERNESS_NAME: &str = "Wilderness";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDecision {
    Allowed,
    /// Zone territory; carries the zone name.
    DeniedZone(String),
    /// Another faction's territory; carries its name.
    DeniedTerritory(String),
}

impl BuildDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BuildDecision::Allowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    DefenderInSafeZone,
    AttackerInSafeZone,
    SameFaction,
    PeacefulHomeland,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageDecision {
    Allow,
    Cancel(CancelReason),
    /// Deal the damage scaled by this fraction instead.
    Reduce(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatChannel {
    Public,
    Faction,
    Ally,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRoute {
    /// Leave the message to the host's normal handling.
    Unchanged,
    /// Deliver only to these players.
    Restricted(Vec<String>),
    /// Deliver to every online player, grouped by their faction's relation
    /// to the sender's faction so each group can be tagged accordingly.
    Tagged(BTreeMap<RelationKind, Vec<String>>),
}

/// A player walked into territory with a different claimer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryNotice {
    pub claimer: FactionId,
    pub name: String,
    pub description: String,
    /// The walker's relation to the new claimer.
    pub relation: RelationKind,
}

/// What a move between cells with different claimers amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerritoryEvent {
    Entered(TerritoryNotice),
    /// The player has autoclaim on; carries the outcome of claiming the
    /// cell they walked into.
    AutoClaimed(Result<FactionId, LedgerError>),
}

impl Ledger {
    /// Whether `player` may place, break, or use blocks in `key`.
    /// Bypassing players may build anywhere.
    pub fn can_build(&self, player: &str, key: &LandKey) -> BuildDecision {
        if self.modes().is_bypassing(player) {
            return BuildDecision::Allowed;
        }
        let Some(owner) = self.claimer_at(key) else {
            return BuildDecision::Allowed;
        };
        let owner = owner.read();
        if !owner.capabilities().buildable {
            return BuildDecision::DeniedZone(owner.name().to_string());
        }
        if owner.is_member(player) || self.lands().land_at(key).read().is_owner(player) {
            return BuildDecision::Allowed;
        }
        BuildDecision::DeniedTerritory(owner.name().to_string())
    }

    /// What to do when `attacker` (standing in `attacker_at`) hurts
    /// `defender` (standing in `defender_at`). A `None` attacker is a
    /// non-player source.
    pub fn damage_decision(
        &self,
        attacker: Option<(&str, &LandKey)>,
        defender: &str,
        defender_at: &LandKey,
    ) -> DamageDecision {
        let defender_land = self.lands().claimer_of(defender_at);
        if self.is_safe(defender_land) {
            return DamageDecision::Cancel(CancelReason::DefenderInSafeZone);
        }
        let Some((attacker, attacker_at)) = attacker else {
            return DamageDecision::Allow;
        };
        if self.is_safe(self.lands().claimer_of(attacker_at)) {
            return DamageDecision::Cancel(CancelReason::AttackerInSafeZone);
        }

        let Some(defense) = self.factions().of_player(defender) else {
            return DamageDecision::Allow;
        };
        let defense = defense.read();
        if defense.is_member(attacker) {
            return DamageDecision::Cancel(CancelReason::SameFaction);
        }
        if defense.id() != defender_land {
            return DamageDecision::Allow;
        }
        if defense.is_peaceful() && self.config().peaceful_damage_immunity {
            return DamageDecision::Cancel(CancelReason::PeacefulHomeland);
        }
        let reduction = self.config().home_land_damage_reduction;
        if reduction <= 0.0 {
            DamageDecision::Allow
        } else {
            DamageDecision::Reduce(reduction)
        }
    }

    fn is_safe(&self, claimer: FactionId) -> bool {
        self.factions()
            .get(claimer)
            .is_some_and(|f| !f.read().capabilities().damageable)
    }

    /// Who should receive a chat message from `sender` on `channel`.
    /// Faction and ally messages also reach every online spy.
    pub fn chat_recipients(&self, sender: &str, channel: ChatChannel, online: &[String]) -> ChatRoute {
        let Some(own) = self.factions().faction_id_of(sender) else {
            return ChatRoute::Unchanged;
        };
        match channel {
            ChatChannel::Faction | ChatChannel::Ally => {
                let allies = if channel == ChatChannel::Ally {
                    self.relations().partners(own, RelationKind::Ally)
                } else {
                    Default::default()
                };
                let mut recipients: Vec<String> = online
                    .iter()
                    .filter(|p| {
                        self.factions()
                            .faction_id_of(p)
                            .is_some_and(|f| f == own || allies.contains(&f))
                    })
                    .cloned()
                    .collect();
                for spy in self.modes().spies() {
                    if online.contains(&spy) && !recipients.contains(&spy) {
                        recipients.push(spy);
                    }
                }
                ChatRoute::Restricted(recipients)
            }
            ChatChannel::Public => {
                let mut groups: BTreeMap<RelationKind, Vec<String>> = BTreeMap::new();
                for player in online {
                    let relation = match self.factions().faction_id_of(player) {
                        Some(theirs) => self.relation_between(own, theirs),
                        None => RelationKind::Neutral,
                    };
                    groups.entry(relation).or_default().push(player.clone());
                }
                ChatRoute::Tagged(groups)
            }
        }
    }

    /// Where `player` should respawn, if their faction home applies.
    pub fn respawn_location(&self, player: &str) -> Option<Location> {
        if !self.config().faction_home_on_death {
            return None;
        }
        let faction = self.factions().of_player(player)?;
        let faction = faction.read();
        faction.home().cloned()
    }

    /// Notice for `player` moving from `from` to `to`, when the claimer
    /// changes.
    pub fn territory_change(&self, player: &str, from: &LandKey, to: &LandKey) -> Option<TerritoryNotice> {
        let start = self.lands().claimer_of(from);
        let finish = self.lands().claimer_of(to);
        if start == finish {
            return None;
        }
        let relation = match self.factions().faction_id_of(player) {
            Some(own) if !finish.is_wilderness() => self.relation_between(own, finish),
            _ => RelationKind::Neutral,
        };
        let (name, description) = match self.factions().get(finish) {
            Some(f) => {
                let f = f.read();
                (f.name().to_string(), f.description().to_string())
            }
            None => (WILDERNESS_NAME.to_string(), String::new()),
        };
        Some(TerritoryNotice {
            claimer: finish,
            name,
            description,
            relation,
        })
    }

    /// Handle `player` moving from `from` to `to`. Nothing happens unless
    /// the claimer changes; then autoclaiming players claim `to` and
    /// everyone else gets a notice.
    pub fn on_move(&self, player: &str, from: &LandKey, to: &LandKey) -> Option<TerritoryEvent> {
        if self.lands().claimer_of(from) == self.lands().claimer_of(to) {
            return None;
        }
        if self.modes().autoclaims(player) {
            let outcome = self.claim_here(player, to);
            if let Err(err) = &outcome {
                tracing::debug!(%player, land = %to, %err, "autoclaim refused");
            }
            return Some(TerritoryEvent::AutoClaimed(outcome));
        }
        self.territory_change(player, from, to).map(TerritoryEvent::Entered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::persist::PersistQueue;

    fn key(x: i32, z: i32) -> LandKey {
        LandKey::new(x, z, "world", 0)
    }

    /// Reds (alice, bob) own (0,0); Blues (carol) own (5,5); (9,9) is a safe zone.
    fn world(config: LedgerConfig) -> Ledger {
        let ledger = Ledger::new(config, PersistQueue::disabled());
        ledger.create_faction("alice", "Reds").unwrap();
        ledger.create_faction("carol", "Blues").unwrap();
        ledger.invite("alice", "bob").unwrap();
        ledger.join("bob", "Reds").unwrap();
        ledger.claim_here("alice", &key(0, 0)).unwrap();
        ledger.claim_here("carol", &key(5, 5)).unwrap();
        ledger.claim_for_zone(FactionId::SAFE_ZONE, &key(9, 9)).unwrap();
        ledger
    }

    #[test]
    fn build_rules() {
        let ledger = world(LedgerConfig::default());
        assert!(ledger.can_build("carol", &key(1, 1)).is_allowed());
        assert!(ledger.can_build("bob", &key(0, 0)).is_allowed());
        assert_eq!(
            ledger.can_build("carol", &key(0, 0)),
            BuildDecision::DeniedTerritory("Reds".to_string())
        );
        assert_eq!(
            ledger.can_build("alice", &key(9, 9)),
            BuildDecision::DeniedZone("SafeZone".to_string())
        );
        ledger.toggle_owner("alice", &key(0, 0), "Carol").unwrap();
        assert!(ledger.can_build("carol", &key(0, 0)).is_allowed());
    }

    #[test]
    fn bypass_builds_anywhere() {
        let ledger = world(LedgerConfig::default());
        assert!(ledger.modes().toggle_bypass("carol"));
        assert!(ledger.can_build("carol", &key(0, 0)).is_allowed());
        assert!(ledger.can_build("carol", &key(9, 9)).is_allowed());

        assert!(!ledger.modes().toggle_bypass("carol"));
        assert!(!ledger.can_build("carol", &key(0, 0)).is_allowed());
    }

    #[test]
    fn safe_zone_cancels_damage() {
        let ledger = world(LedgerConfig::default());
        assert_eq!(
            ledger.damage_decision(Some(("carol", &key(1, 1))), "alice", &key(9, 9)),
            DamageDecision::Cancel(CancelReason::DefenderInSafeZone)
        );
        assert_eq!(
            ledger.damage_decision(Some(("carol", &key(9, 9))), "alice", &key(1, 1)),
            DamageDecision::Cancel(CancelReason::AttackerInSafeZone)
        );
        assert_eq!(ledger.damage_decision(None, "alice", &key(1, 1)), DamageDecision::Allow);
    }

    #[test]
    fn same_faction_cannot_fight() {
        let ledger = world(LedgerConfig::default());
        assert_eq!(
            ledger.damage_decision(Some(("bob", &key(1, 1))), "alice", &key(1, 1)),
            DamageDecision::Cancel(CancelReason::SameFaction)
        );
    }

    #[test]
    fn homeland_reduction_and_peaceful_immunity() {
        let config = LedgerConfig {
            home_land_damage_reduction: 0.5,
            ..LedgerConfig::default()
        };
        let ledger = world(config);
        assert_eq!(
            ledger.damage_decision(Some(("carol", &key(0, 0))), "alice", &key(0, 0)),
            DamageDecision::Reduce(0.5)
        );
        assert_eq!(
            ledger.damage_decision(Some(("alice", &key(1, 1))), "carol", &key(1, 1)),
            DamageDecision::Allow
        );
        ledger.toggle_peaceful("alice").unwrap();
        assert_eq!(
            ledger.damage_decision(Some(("carol", &key(0, 0))), "alice", &key(0, 0)),
            DamageDecision::Cancel(CancelReason::PeacefulHomeland)
        );
    }

    #[test]
    fn chat_routing() {
        let ledger = world(LedgerConfig::default());
        ledger.create_faction("gus", "Greens").unwrap();
        ledger.declare("alice", "Blues", RelationKind::Ally).unwrap();
        ledger.declare("alice", "Greens", RelationKind::Enemy).unwrap();
        let online: Vec<String> = ["alice", "bob", "carol", "gus", "loner"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            ledger.chat_recipients("bob", ChatChannel::Faction, &online),
            ChatRoute::Restricted(vec!["alice".to_string(), "bob".to_string()])
        );
        assert_eq!(
            ledger.chat_recipients("bob", ChatChannel::Ally, &online),
            ChatRoute::Restricted(vec!["alice".to_string(), "bob".to_string(), "carol".to_string()])
        );
        let ChatRoute::Tagged(groups) = ledger.chat_recipients("bob", ChatChannel::Public, &online) else {
            panic!("public chat should be tagged");
        };
        assert_eq!(groups[&RelationKind::Same], ["alice", "bob"]);
        assert_eq!(groups[&RelationKind::Ally], ["carol"]);
        assert_eq!(groups[&RelationKind::Enemy], ["gus"]);
        assert_eq!(groups[&RelationKind::Neutral], ["loner"]);
        assert_eq!(
            ledger.chat_recipients("loner", ChatChannel::Faction, &online),
            ChatRoute::Unchanged
        );
    }

    #[test]
    fn spies_hear_faction_and_ally_chat() {
        let ledger = world(LedgerConfig::default());
        ledger.modes().toggle_spy("carol");
        ledger.modes().toggle_spy("offline-mod");
        ledger.modes().toggle_spy("alice");
        let online: Vec<String> = ["alice", "bob", "carol", "loner"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let expected = ChatRoute::Restricted(vec![
            "alice".to_string(),
            "bob".to_string(),
            "carol".to_string(),
        ]);
        assert_eq!(ledger.chat_recipients("bob", ChatChannel::Faction, &online), expected);
        assert_eq!(ledger.chat_recipients("bob", ChatChannel::Ally, &online), expected);
        assert!(matches!(
            ledger.chat_recipients("bob", ChatChannel::Public, &online),
            ChatRoute::Tagged(_)
        ));
    }

    #[test]
    fn autoclaim_claims_on_crossing_into_new_territory() {
        let ledger = world(LedgerConfig::default());
        assert!(ledger.modes().toggle_autoclaim("alice"));

        // Same claimer on both sides: nothing happens.
        assert_eq!(ledger.on_move("alice", &key(1, 1), &key(2, 2)), None);
        assert_eq!(ledger.lands().claimer_of(&key(2, 2)), FactionId::WILDERNESS);

        let reds = ledger.factions().faction_id_of("alice").unwrap();
        assert_eq!(
            ledger.on_move("alice", &key(0, 0), &key(0, 1)),
            Some(TerritoryEvent::AutoClaimed(Ok(reds)))
        );
        assert_eq!(ledger.lands().claimer_of(&key(0, 1)), reds);

        let blues = ledger.factions().faction_id_of("carol").unwrap();
        assert_eq!(
            ledger.on_move("alice", &key(0, 1), &key(5, 5)),
            Some(TerritoryEvent::AutoClaimed(Err(LedgerError::AlreadyClaimed(blues))))
        );

        let Some(TerritoryEvent::Entered(notice)) = ledger.on_move("bob", &key(0, 1), &key(5, 5)) else {
            panic!("bob has no autoclaim and should get a notice");
        };
        assert_eq!(notice.name, "Blues");
    }

    #[test]
    fn respawn_at_home_when_enabled() {
        let ledger = world(LedgerConfig::default());
        assert_eq!(ledger.respawn_location("bob"), None);
        let home = Location::new("world", 0, 10.0, 64.0, 10.0);
        ledger.set_home("alice", Some(home.clone())).unwrap();
        assert_eq!(ledger.respawn_location("bob"), Some(home));

        let ledger = world(LedgerConfig {
            faction_home_on_death: false,
            ..LedgerConfig::default()
        });
        ledger
            .set_home("alice", Some(Location::new("world", 0, 1.0, 1.0, 1.0)))
            .unwrap();
        assert_eq!(ledger.respawn_location("bob"), None);
    }

    #[test]
    fn territory_notices() {
        let ledger = world(LedgerConfig::default());
        ledger.set_description("carol", "blue team").unwrap();
        ledger.declare("carol", "Reds", RelationKind::Enemy).unwrap();

        assert_eq!(ledger.territory_change("bob", &key(1, 1), &key(2, 2)), None);
        let notice = ledger.territory_change("bob", &key(1, 1), &key(5, 5)).unwrap();
        assert_eq!(notice.name, "Blues");
        assert_eq!(notice.description, "blue team");
        assert_eq!(notice.relation, RelationKind::Enemy);

        let notice = ledger.territory_change("bob", &key(5, 5), &key(1, 1)).unwrap();
        assert_eq!(notice.claimer, FactionId::WILDERNESS);
        assert_eq!(notice.name, "Wilderness");
        assert_eq!(notice.relation, RelationKind::Neutral);
    }
}
