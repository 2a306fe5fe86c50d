use std::collections::BTreeSet;

use parking_lot::RwLock;

/// Per-player toggles that change how territory rules apply to them.
///
/// Held in memory only; a restart clears every mode.
#[derive(Debug, Default)]
pub struct PlayerModes {
    /// Ignore territory build rules.
    bypass: RwLock<BTreeSet<String>>,
    /// Receive faction and ally chat of every faction.
    spying: RwLock<BTreeSet<String>>,
    /// Claim each cell walked into.
    autoclaim: RwLock<BTreeSet<String>>,
}

fn toggle(set: &RwLock<BTreeSet<String>>, player: &str) -> bool {
    let mut set = set.write();
    if set.remove(player) {
        false
    } else {
        set.insert(player.to_string());
        true
    }
}

impl PlayerModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `player` is now bypassing.
    pub fn toggle_bypass(&self, player: &str) -> bool {
        let on = toggle(&self.bypass, player);
        tracing::info!(%player, on, "bypass toggled");
        on
    }

    pub fn toggle_spy(&self, player: &str) -> bool {
        let on = toggle(&self.spying, player);
        tracing::info!(%player, on, "chat spy toggled");
        on
    }

    pub fn toggle_autoclaim(&self, player: &str) -> bool {
        let on = toggle(&self.autoclaim, player);
        tracing::debug!(%player, on, "autoclaim toggled");
        on
    }

    pub fn is_bypassing(&self, player: &str) -> bool {
        self.bypass.read().contains(player)
    }

    pub fn is_spying(&self, player: &str) -> bool {
        self.spying.read().contains(player)
    }

    pub fn autoclaims(&self, player: &str) -> bool {
        self.autoclaim.read().contains(player)
    }

    /// Every player with chat spy on, sorted.
    pub fn spies(&self) -> Vec<String> {
        self.spying.read().iter().cloned().collect()
    }

    /// Drop every mode of a player who went offline.
    pub fn forget(&self, player: &str) {
        self.bypass.write().remove(player);
        self.spying.write().remove(player);
        self.autoclaim.write().remove(player);
    }
}
