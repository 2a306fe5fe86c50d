use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::id::FactionId;
use crate::ledger::Ledger;
use crate::model::{Faction, RelationKind};

/// Who is connected right now, and what they are called.
pub trait Presence {
    fn is_online(&self, player: &str) -> bool;

    /// Title shown before a player's name, if any.
    fn title(&self, _player: &str) -> Option<String> {
        None
    }
}

impl Presence for HashSet<String> {
    fn is_online(&self, player: &str) -> bool {
        self.contains(player)
    }
}

impl Presence for BTreeSet<String> {
    fn is_online(&self, player: &str) -> bool {
        self.contains(player)
    }
}

/// Online players keyed by name, with optional titles.
impl Presence for HashMap<String, Option<String>> {
    fn is_online(&self, player: &str) -> bool {
        self.contains_key(player)
    }

    fn title(&self, player: &str) -> Option<String> {
        self.get(player).cloned().flatten()
    }
}

impl Presence for BTreeMap<String, Option<String>> {
    fn is_online(&self, player: &str) -> bool {
        self.contains_key(player)
    }

    fn title(&self, player: &str) -> Option<String> {
        self.get(player).cloned().flatten()
    }
}

/// A faction summary as seen by another faction.
#[derive(Debug, Clone, PartialEq)]
pub struct WhoReport {
    pub name: String,
    pub description: String,
    /// The viewer's relation to this faction.
    pub relation: RelationKind,
    pub open: bool,
    pub peaceful: bool,
    pub land: usize,
    /// Comma separated, admin first, then mods, then members. May be empty.
    pub online: String,
    pub offline: String,
}

impl WhoReport {
    /// Summarize `faction` for a viewer whose relation to it is `relation`.
    pub fn build(faction: &Faction, relation: RelationKind, land: usize, presence: &dyn Presence) -> Self {
        let mut online = Vec::new();
        let mut offline = Vec::new();
        for (player, rank) in faction.all_members() {
            let title = presence
                .title(player)
                .filter(|t| !t.is_empty())
                .map(|t| format!("{t} "))
                .unwrap_or_default();
            let entry = format!("{title}{}{player}", rank.prefix());
            if presence.is_online(player) {
                online.push(entry);
            } else {
                offline.push(entry);
            }
        }
        Self {
            name: faction.name().to_string(),
            description: faction.description().to_string(),
            relation,
            open: faction.is_open(),
            peaceful: faction.is_peaceful(),
            land,
            online: online.join(", "),
            offline: offline.join(", "),
        }
    }

    /// Lines ready to send to a player.
    pub fn lines(&self) -> Vec<String> {
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        let mut lines = vec![format!("------------ {} ------------", self.name)];
        if !self.description.is_empty() {
            lines.push(self.description.clone());
        }
        lines.push(format!(
            "Open: {}    Peaceful: {}",
            yes_no(self.open),
            yes_no(self.peaceful)
        ));
        lines.push(format!("Land: {}", self.land));
        lines.push(format!("Members online: {}", self.online));
        lines.push(format!("Members offline: {}", self.offline));
        lines
    }
}

impl fmt::Display for WhoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

impl Ledger {
    /// Summary of `faction` as seen from `viewer` (`None` for a player with
    /// no faction, who sees everyone as neutral).
    pub fn who(
        &self,
        faction: FactionId,
        viewer: Option<FactionId>,
        presence: &dyn Presence,
    ) -> Option<WhoReport> {
        let handle = self.factions().get(faction)?;
        let relation = viewer.map_or(RelationKind::Neutral, |v| self.relation_between(v, faction));
        let land = self.lands().count_of(faction);
        let faction = handle.read();
        Some(WhoReport::build(&faction, relation, land, presence))
    }
}
