mod factions;
mod lands;
mod modes;
mod relations;

pub use factions::{FactionHandle, FactionManager, LeaveOutcome};
pub use lands::{LandHandle, LandManager};
pub use modes::PlayerModes;
pub use relations::RelationGraph;
