pub mod config;
pub mod db;
pub mod error;
pub mod flush;
pub mod id;
pub mod ledger;
pub mod model;
pub mod persist;
pub mod policy;
pub mod registry;
pub mod who;

pub use config::{LedgerConfig, SavePolicy};
pub use error::{LedgerError, StoreError};
pub use id::{FactionId, FactionIdGenerator};
pub use ledger::{Ledger, spawn_periodic_flush};
pub use model::{
    Capabilities, Faction, FactionKind, Land, LandKey, Location, Rank, Relation, RelationKind,
};
pub use persist::{
    LedgerSnapshot, LedgerStore, MemoryStore, PersistQueue, PersistRequest, StoreStats,
    run_store_worker, spawn_store_worker,
};
pub use policy::{
    BuildDecision, CancelReason, ChatChannel, ChatRoute, DamageDecision, TerritoryEvent,
    TerritoryNotice,
};
pub use registry::{LeaveOutcome, PlayerModes};
pub use who::{Presence, WhoReport};
