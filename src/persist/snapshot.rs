use serde::{Deserialize, Serialize};

use crate::model::{Faction, Land, Relation};

/// Everything the ledger needs to start up, and everything a flush writes.
///
/// Only claimed land, player-created factions, and explicit relation edges
/// appear here; the zones are rebuilt at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub factions: Vec<Faction>,
    pub lands: Vec<Land>,
    pub relations: Vec<Relation>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty() && self.lands.is_empty() && self.relations.is_empty()
    }
}
