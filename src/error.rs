use thiserror::Error;

use crate::id::FactionId;
use crate::model::{Rank, RelationKind};

/// A domain operation that was refused. In-memory state is unchanged when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{player} is not a member of faction {faction}")]
    NotAMember { player: String, faction: FactionId },
    #[error("{player} is not in a faction")]
    NoFaction { player: String },
    #[error("{player} already belongs to faction {faction}")]
    AlreadyInFaction { player: String, faction: FactionId },
    #[error("faction {0} was not found")]
    NoSuchFaction(String),
    #[error("no faction ids are left")]
    IdsExhausted,
    #[error("a faction named {0} already exists")]
    NameTaken(String),
    #[error("invalid faction name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("requires rank {required}, have {actual}")]
    InsufficientRank { required: Rank, actual: Rank },
    #[error("{player} has no invitation to faction {faction}")]
    NotInvited { player: String, faction: FactionId },
    #[error("faction {0} is a zone and cannot do that")]
    ZoneFaction(FactionId),
    #[error("a faction cannot set a relation with itself")]
    SelfRelation,
    #[error("cannot set relation {0} explicitly")]
    InvalidRelation(RelationKind),
    #[error("faction {0} is peaceful and cannot be declared an enemy")]
    PeacefulTarget(FactionId),
    #[error("the admin must transfer the faction before leaving")]
    AdminCannotLeave,
    #[error("this land belongs to faction {0}")]
    AlreadyClaimed(FactionId),
    #[error("this land is not claimed by faction {0}")]
    NotClaimedBy(FactionId),
    #[error("this land cannot be claimed")]
    NotClaimable,
}

/// A failure reported by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt stored row: {0}")]
    Corrupt(String),
}
