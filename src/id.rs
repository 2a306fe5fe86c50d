use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a faction. `-1` is the wilderness sentinel and never names
/// a real faction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(i32);

impl FactionId {
    /// The unclaimed / "no faction" sentinel.
    pub const WILDERNESS: FactionId = FactionId(-1);
    pub const SAFE_ZONE: FactionId = FactionId(0);
    pub const WAR_ZONE: FactionId = FactionId(1);

    /// First id handed out to player-created factions.
    pub const FIRST_NORMAL: i32 = 2;

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }

    pub fn is_wilderness(self) -> bool {
        self == Self::WILDERNESS
    }

    /// One of the two server-owned zones.
    pub fn is_zone(self) -> bool {
        self == Self::SAFE_ZONE || self == Self::WAR_ZONE
    }

    /// Negative ids other than the sentinel are never valid.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic faction id generator. Safe to share between threads.
#[derive(Debug)]
pub struct FactionIdGenerator {
    next: AtomicI32,
}

impl FactionIdGenerator {
    pub fn new() -> Self {
        Self::starting_from(FactionId::FIRST_NORMAL)
    }

    pub fn starting_from(start: i32) -> Self {
        Self {
            next: AtomicI32::new(start.max(FactionId::FIRST_NORMAL)),
        }
    }

    /// The next unused id, or `None` once the id space is used up.
    pub fn next_id(&self) -> Option<FactionId> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .ok()
            .map(FactionId)
    }

    /// Make sure ids handed out later never collide with `seen`.
    pub fn observe(&self, seen: FactionId) {
        self.next.fetch_max(seen.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for FactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
