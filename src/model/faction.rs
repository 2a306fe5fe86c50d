use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::location::Location;
use crate::error::LedgerError;
use crate::id::FactionId;

/// A player's authority within a faction, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Member,
    Mod,
    Admin,
}

impl Rank {
    /// Prefix shown before a player's name in rosters.
    pub fn prefix(self) -> &'static str {
        match self {
            Rank::Member => "",
            Rank::Mod => "*",
            Rank::Admin => "**",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::Member => "member",
            Rank::Mod => "mod",
            Rank::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// What a faction's territory and roster allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Players may join it.
    pub joinable: bool,
    /// Players inside its territory may be hurt.
    pub damageable: bool,
    /// Players may claim cells for it.
    pub claimable: bool,
    /// Players may build inside its territory (subject to membership).
    pub buildable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionKind {
    Normal,
    Wilderness,
    SafeZone,
    WarZone,
}

impl FactionKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            FactionKind::Normal => Capabilities {
                joinable: true,
                damageable: true,
                claimable: true,
                buildable: true,
            },
            FactionKind::Wilderness => Capabilities {
                joinable: false,
                damageable: true,
                claimable: false,
                buildable: true,
            },
            FactionKind::SafeZone => Capabilities {
                joinable: false,
                damageable: false,
                claimable: false,
                buildable: false,
            },
            FactionKind::WarZone => Capabilities {
                joinable: false,
                damageable: true,
                claimable: false,
                buildable: false,
            },
        }
    }

    pub fn is_zone(self) -> bool {
        matches!(self, FactionKind::SafeZone | FactionKind::WarZone)
    }
}

/// A faction and its ranked roster.
///
/// Rank sets are disjoint only as long as callers remove a name from one set
/// before adding it to another; the registry does this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    id: FactionId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    open: bool,
    #[serde(default)]
    peaceful: bool,
    kind: FactionKind,
    /// Empty only for zone factions.
    #[serde(default)]
    admin: String,
    #[serde(default)]
    home: Option<Location>,
    #[serde(default)]
    mods: Vec<String>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(skip)]
    invited: BTreeSet<String>,
    #[serde(skip)]
    disbanded: bool,
}

impl Faction {
    pub fn new(id: FactionId, name: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            open: false,
            peaceful: false,
            kind: FactionKind::Normal,
            admin: admin.into(),
            home: None,
            mods: Vec::new(),
            members: Vec::new(),
            invited: BTreeSet::new(),
            disbanded: false,
        }
    }

    /// A server-owned zone with no roster.
    pub fn zone(id: FactionId, kind: FactionKind, name: impl Into<String>) -> Self {
        let mut faction = Self::new(id, name, String::new());
        faction.kind = kind;
        faction.peaceful = kind == FactionKind::SafeZone;
        faction
    }

    pub fn id(&self) -> FactionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_peaceful(&self) -> bool {
        self.peaceful
    }

    pub fn kind(&self) -> FactionKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    pub fn is_zone(&self) -> bool {
        self.kind.is_zone()
    }

    pub fn admin(&self) -> &str {
        &self.admin
    }

    pub fn home(&self) -> Option<&Location> {
        self.home.as_ref()
    }

    pub fn mods(&self) -> &[String] {
        &self.mods
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn is_member(&self, player: &str) -> bool {
        (!self.admin.is_empty() && self.admin == player)
            || self.mods.iter().any(|m| m == player)
            || self.members.iter().any(|m| m == player)
    }

    pub fn rank(&self, player: &str) -> Result<Rank, LedgerError> {
        if !self.admin.is_empty() && self.admin == player {
            Ok(Rank::Admin)
        } else if self.mods.iter().any(|m| m == player) {
            Ok(Rank::Mod)
        } else if self.members.iter().any(|m| m == player) {
            Ok(Rank::Member)
        } else {
            Err(LedgerError::NotAMember {
                player: player.to_string(),
                faction: self.id,
            })
        }
    }

    /// Everyone in the faction, admin first, then mods, then members.
    pub fn all_members(&self) -> impl Iterator<Item = (&str, Rank)> {
        let admin = (!self.admin.is_empty()).then_some((self.admin.as_str(), Rank::Admin));
        admin
            .into_iter()
            .chain(self.mods.iter().map(|m| (m.as_str(), Rank::Mod)))
            .chain(self.members.iter().map(|m| (m.as_str(), Rank::Member)))
    }

    /// Rank of `actor`, provided it is at least `required`.
    pub fn require(&self, actor: &str, required: Rank) -> Result<Rank, LedgerError> {
        let actual = self.rank(actor)?;
        if actual < required {
            return Err(LedgerError::InsufficientRank { required, actual });
        }
        Ok(actual)
    }

    /// Set once the faction has left the registry. Handles that outlive the
    /// removal must not act on it.
    pub fn is_disbanded(&self) -> bool {
        self.disbanded
    }

    pub(crate) fn mark_disbanded(&mut self) {
        self.disbanded = true;
    }

    pub fn member_count(&self) -> usize {
        self.all_members().count()
    }

    pub fn add_members<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            push_unique(&mut self.members, name.into());
        }
    }

    pub fn add_mods<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            push_unique(&mut self.mods, name.into());
        }
    }

    pub fn add(&mut self, player: impl Into<String>) {
        push_unique(&mut self.members, player.into());
    }

    /// Remove a base member. No-op for anyone else.
    pub fn remove(&mut self, player: &str) {
        self.members.retain(|m| m != player);
    }

    /// Remove a player from whichever of the mod and member sets holds them.
    /// Returns false when they were in neither.
    pub fn remove_from_roster(&mut self, player: &str) -> bool {
        let before = self.mods.len() + self.members.len();
        self.mods.retain(|m| m != player);
        self.members.retain(|m| m != player);
        before != self.mods.len() + self.members.len()
    }

    /// Make `player` the admin. The previous admin is not placed anywhere.
    pub fn set_admin(&mut self, player: impl Into<String>) {
        self.admin = player.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn set_peaceful(&mut self, peaceful: bool) {
        self.peaceful = peaceful;
    }

    pub fn set_home(&mut self, home: Option<Location>) {
        self.home = home;
    }

    pub fn invite(&mut self, player: &str) -> bool {
        self.invited.insert(player.to_string())
    }

    pub fn deinvite(&mut self, player: &str) -> bool {
        self.invited.remove(player)
    }

    pub fn is_invited(&self, player: &str) -> bool {
        self.invited.contains(player)
    }
}

fn push_unique(set: &mut Vec<String>, name: String) {
    if !set.contains(&name) {
        set.push(name);
    }
}
