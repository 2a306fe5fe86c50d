use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::location::Location;
use crate::id::FactionId;

/// Identity of a land cell. Two cells are the same iff all four parts match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LandKey {
    pub x: i32,
    pub z: i32,
    pub world: String,
    pub dimension: i32,
}

impl LandKey {
    pub fn new(x: i32, z: i32, world: impl Into<String>, dimension: i32) -> Self {
        Self {
            x,
            z,
            world: world.into(),
            dimension,
        }
    }

    /// The cell containing `location`.
    pub fn containing(location: &Location) -> Self {
        let (x, z) = location.chunk();
        Self::new(x, z, location.world.clone(), location.dimension)
    }
}

impl fmt::Display for LandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{},{}/{}", self.world, self.x, self.z, self.dimension)
    }
}

/// What the persistence collaborator should do after a land mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandWrite {
    Save,
    Delete,
}

/// A single world cell and its ownership data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Land {
    #[serde(flatten)]
    key: LandKey,
    #[serde(rename = "faction")]
    claimer: FactionId,
    #[serde(default)]
    owners: BTreeSet<String>,
}

impl Land {
    /// An unclaimed cell with no owners.
    pub fn new(key: LandKey) -> Self {
        Self {
            key,
            claimer: FactionId::WILDERNESS,
            owners: BTreeSet::new(),
        }
    }

    pub fn with_claim(key: LandKey, claimer: FactionId, owners: impl IntoIterator<Item = String>) -> Self {
        Self {
            key,
            claimer,
            owners: owners.into_iter().map(|o| o.to_lowercase()).collect(),
        }
    }

    pub fn key(&self) -> &LandKey {
        &self.key
    }

    pub fn claimer_id(&self) -> FactionId {
        self.claimer
    }

    pub fn is_claimed(&self) -> bool {
        !self.claimer.is_wilderness()
    }

    /// Set the claiming faction.
    ///
    /// The wilderness sentinel, or any other negative id, leaves the cell
    /// unclaimed with no owners and asks for deletion. Any valid id asks for
    /// a save, even when the claimer is unchanged.
    pub fn claim(&mut self, faction: FactionId) -> LandWrite {
        if faction.is_valid() {
            self.claimer = faction;
            LandWrite::Save
        } else {
            if !faction.is_wilderness() {
                tracing::warn!(land = %self.key, faction = %faction, "claim with invalid faction id, unclaiming");
            }
            self.claimer = FactionId::WILDERNESS;
            self.owners.clear();
            LandWrite::Delete
        }
    }

    /// Unclaim the cell. Shorthand for `claim(FactionId::WILDERNESS)`.
    pub fn unclaim(&mut self) -> LandWrite {
        self.claim(FactionId::WILDERNESS)
    }

    /// Toggle build permission for `player`. Returns true if they can now build.
    pub fn toggle_owner(&mut self, player: &str) -> bool {
        let player = player.to_lowercase();
        if self.owners.remove(&player) {
            false
        } else {
            self.owners.insert(player);
            true
        }
    }

    pub fn is_owner(&self, player: &str) -> bool {
        self.owners.contains(&player.to_lowercase())
    }

    pub fn owners(&self) -> Vec<String> {
        self.owners.iter().cloned().collect()
    }
}
